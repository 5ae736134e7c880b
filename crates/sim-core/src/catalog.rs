//! Fixed catalog of recognized variable codes.
//!
//! Codes outside the catalog are passed through opaquely; the catalog only
//! supplies display names and units for reporting.

/// Display metadata for one variable code.
#[derive(Clone, Copy, Debug)]
pub struct VariableInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
}

/// The recognized variable codes, keyed by mnemonic.
pub const CATALOG: &[VariableInfo] = &[
    VariableInfo { code: "PVP", name: "precio de venta al público", unit: "EUR/unidad" },
    VariableInfo { code: "CPD", name: "clientes por día", unit: "clientes/día" },
    VariableInfo { code: "DH", name: "demanda histórica", unit: "unidades" },
    VariableInfo { code: "DE", name: "demanda esperada", unit: "unidades/día" },
    VariableInfo { code: "DPH", name: "demanda promedio histórica", unit: "unidades/día" },
    VariableInfo { code: "DSD", name: "desviación estándar de la demanda", unit: "unidades" },
    VariableInfo { code: "CVD", name: "coeficiente de variación de la demanda", unit: "ratio" },
    VariableInfo { code: "VPC", name: "ventas por cliente", unit: "unidades/cliente" },
    VariableInfo { code: "CP", name: "cantidad planificada de producción", unit: "unidades/día" },
    VariableInfo { code: "CPROD", name: "capacidad de producción", unit: "unidades/día" },
    VariableInfo { code: "TCAE", name: "total de clientes atendidos estimado", unit: "clientes/día" },
    VariableInfo { code: "TPV", name: "total de productos vendidos", unit: "unidades/día" },
    VariableInfo { code: "TPPRO", name: "total de productos producidos", unit: "unidades/día" },
    VariableInfo { code: "IT", name: "ingresos totales", unit: "EUR/día" },
    VariableInfo { code: "CI", name: "costo unitario de insumos", unit: "EUR/unidad" },
    VariableInfo { code: "CTAI", name: "costo total de adquisición de insumos", unit: "EUR/día" },
    VariableInfo { code: "MOD", name: "mano de obra directa", unit: "EUR/día" },
    VariableInfo { code: "GO", name: "gastos operativos", unit: "EUR/día" },
    VariableInfo { code: "GG", name: "gastos generales", unit: "EUR/día" },
    VariableInfo { code: "TG", name: "total de gastos", unit: "EUR/día" },
    VariableInfo { code: "GT", name: "ganancia total", unit: "EUR/día" },
    VariableInfo { code: "MB", name: "margen bruto", unit: "ratio" },
    VariableInfo { code: "FU", name: "factor de utilización", unit: "ratio" },
    VariableInfo { code: "PE", name: "punto de equilibrio", unit: "unidades/día" },
    VariableInfo { code: "FS", name: "factor de estacionalidad", unit: "ratio" },
    VariableInfo { code: "TE", name: "tiempo de entrega", unit: "días" },
    VariableInfo { code: "SS", name: "stock de seguridad", unit: "unidades" },
    VariableInfo { code: "NR", name: "nivel de reorden", unit: "unidades" },
    VariableInfo { code: "II", name: "inventario de insumos", unit: "unidades" },
    VariableInfo { code: "IPF", name: "inventario de producto final", unit: "unidades" },
    VariableInfo { code: "DI", name: "días de inventario", unit: "días" },
    VariableInfo { code: "RI", name: "rotación de inventario", unit: "ratio" },
    VariableInfo { code: "RTI", name: "retorno total de la inversión", unit: "ratio" },
    VariableInfo { code: "NE", name: "número de empleados", unit: "personas" },
    VariableInfo { code: "SB", name: "salario base mensual", unit: "EUR/mes" },
    VariableInfo { code: "GM", name: "gasto en marketing", unit: "EUR/día" },
    VariableInfo { code: "PC", name: "precio de la competencia", unit: "EUR/unidad" },
    VariableInfo { code: "PM", name: "participación de mercado", unit: "ratio" },
    VariableInfo { code: "NCM", name: "nuevos clientes por marketing", unit: "clientes/día" },
    VariableInfo { code: "CF", name: "costos fijos", unit: "EUR/día" },
];

/// Look a code up in the catalog.
pub fn lookup(code: &str) -> Option<&'static VariableInfo> {
    CATALOG.iter().find(|v| v.code == code)
}

/// Whether the code belongs to the fixed catalog.
pub fn is_known(code: &str) -> bool {
    lookup(code).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_codes_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[i + 1..] {
                assert_ne!(a.code, b.code);
            }
        }
    }

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(lookup("PVP").unwrap().unit, "EUR/unidad");
        assert!(lookup("ZZZ").is_none());
        assert!(is_known("TPV"));
    }
}
