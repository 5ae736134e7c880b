#![deny(warnings)]

//! Headless CLI: fit a demand distribution, simulate the horizon and print
//! a KPI summary, optionally exporting the day series as CSV or JSON.

use anyhow::{Context, Result};
use serde::Deserialize;
use sim_core::{
    Answer, AnswerValue, DemandSample, Distribution, DistributionSpec, FittedDistribution,
    VarCode,
};
use sim_equations::EquationCatalog;
use sim_runtime::{run_simulation, summarize, SimulationConfig};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    answers: Option<String>,
    equations: Option<String>,
    demand: Option<String>,
    days: usize,
    seed: u64,
    csv: Option<String>,
    json: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args {
        answers: None,
        equations: None,
        demand: None,
        days: 30,
        seed: 42,
        csv: None,
        json: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--answers" => args.answers = it.next(),
            "--equations" => args.equations = it.next(),
            "--demand" => args.demand = it.next(),
            "--days" => args.days = it.next().and_then(|s| s.parse().ok()).unwrap_or(30),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()).unwrap_or(42),
            "--csv" => args.csv = it.next(),
            "--json" => args.json = it.next(),
            _ => {}
        }
    }
    args
}

#[derive(Deserialize)]
struct AnswerFile {
    answers: Vec<Answer>,
}

fn load_answers(path: &str) -> Result<Vec<Answer>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let file: AnswerFile = serde_yaml::from_str(&text).with_context(|| format!("parsing {path}"))?;
    Ok(file.answers)
}

/// Questionnaire of a small dairy producer, used when no file is given.
fn demo_answers() -> Vec<Answer> {
    let coded = |code: &str, question: &str, answer: AnswerValue| Answer {
        code: Some(VarCode::from(code)),
        question: question.to_string(),
        answer,
    };
    let free = |question: &str, answer: AnswerValue| Answer {
        code: None,
        question: question.to_string(),
        answer,
    };
    vec![
        coded("PVP", "¿Precio de venta del litro?", AnswerValue::Text("2,80 EUR".into())),
        coded("CPD", "¿Clientes atendidos por día?", AnswerValue::Number(120.0)),
        coded(
            "DH",
            "Demanda diaria de los últimos 30 días",
            AnswerValue::Text(
                "[513, 820, 648, 720, 649, 414, 704, 814, 647, 934, 483, 882, 220, 419, 254, \
                 781, 674, 498, 518, 948, 983, 154, 649, 625, 865, 800, 848, 783, 218, 906]"
                    .into(),
            ),
        ),
        free("¿Capacidad de producción diaria en litros?", AnswerValue::Number(950.0)),
        free("¿Cantidad planificada de producción?", AnswerValue::Number(800.0)),
        free("¿Costo del insumo por litro?", AnswerValue::Text("0,95".into())),
        free("¿Cuántos empleados tiene la planta?", AnswerValue::Number(4.0)),
        free("¿Salario base mensual?", AnswerValue::Text("1100 EUR".into())),
        free("¿Factor de estacionalidad del período?", AnswerValue::Number(1.1)),
        free("¿Gasto diario en marketing?", AnswerValue::Number(15.0)),
        free("¿Mantiene stock de seguridad?", AnswerValue::Text("Sí".into())),
    ]
}

/// Default equation catalog covering the main business areas.
fn demo_catalog() -> Result<EquationCatalog> {
    let text = r#"
equations:
  - area: sales
    output: TCAE
    expression: "min(CPD, DE / VPC)"
    depends: [CPD, DE, VPC]
  - area: sales
    output: TPV
    expression: "min(TCAE * VPC, DE, 0.9 * CPROD)"
    depends: [TCAE, VPC, DE, CPROD]
  - area: production
    output: TPPRO
    expression: "min(TPV * 1.05, CPROD)"
    depends: [TPV, CPROD]
  - area: accounting
    output: IT
    expression: "TPV * PVP"
    depends: [TPV, PVP]
  - area: accounting
    output: CTAI
    expression: "TPPRO * CI"
    depends: [TPPRO, CI]
  - area: accounting
    output: GO
    expression: "NE * SB / 30 + 0.1 * IT"
    depends: [NE, SB, IT]
  - area: finished-goods-inventory
    output: IPF
    expression: "max(TPPRO - TPV, 0) + SS"
    depends: [TPPRO, TPV, SS]
  - area: procurement
    output: NR
    expression: "DPH * TE + SS"
    depends: [DPH, TE, SS]
  - area: marketing
    output: NCM
    expression: "GM / (10 * PVP)"
    depends: [GM, PVP]
"#;
    Ok(EquationCatalog::from_yaml_str(text)?)
}

/// Candidate set a business would have pre-configured: one record per
/// supported family, parameterized from the sample moments.
fn candidates(sample: &DemandSample) -> Vec<DistributionSpec> {
    let (m, sd) = sim_stats::moments(sample.values());
    vec![
        DistributionSpec::new(Distribution::Normal { mean: m, std_dev: sd }),
        DistributionSpec::new(Distribution::Exponential { lambda: if m > 0.0 { 1.0 / m } else { 1.0 } }),
        DistributionSpec::new(Distribution::LogNormal { mean: m, std_dev: sd }),
    ]
}

fn export_csv(path: &str, days: &[sim_core::DayResult]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    let columns: Vec<String> = days
        .first()
        .map(|d| d.variables.keys().cloned().collect())
        .unwrap_or_default();
    let mut header = vec!["day".to_string(), "demand_mean".into(), "demand_std".into()];
    header.extend(columns.iter().cloned());
    wtr.write_record(&header)?;
    for day in days {
        let mut record = vec![
            day.day.to_string(),
            format!("{:.2}", day.demand_mean),
            format!("{:.2}", day.demand_std),
        ];
        for col in &columns {
            record.push(format!("{:.2}", day.get(col).unwrap_or(0.0)));
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    println!("Exported {} rows to '{}'", days.len(), path);
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();

    let answers = match &args.answers {
        Some(path) => load_answers(path)?,
        None => demo_answers(),
    };
    let catalog = match &args.equations {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            EquationCatalog::from_yaml_str(&text)?
        }
        None => demo_catalog()?,
    };

    // Historical demand: --demand overrides, else the DH answer.
    let sample = match &args.demand {
        Some(raw) => DemandSample::from_answer(&AnswerValue::Text(raw.clone()))?,
        None => {
            let dh = answers
                .iter()
                .find(|a| a.code.as_ref().map(VarCode::as_str) == Some("DH"))
                .map(|a| a.answer.clone())
                .unwrap_or(AnswerValue::Text(String::new()));
            DemandSample::from_answer(&dh)?
        }
    };

    let fitted = match sim_stats::fit(&sample, &candidates(&sample)) {
        Ok(f) => f,
        Err(e) => {
            // Recoverable: fall back to a moment-fitted Normal.
            warn!(error = %e, "falling back to moment-fitted normal");
            let dist = sim_stats::moment_normal(&sample);
            FittedDistribution {
                dist,
                cdf_at_mean: sim_stats::cdf(&dist, dist.mean()),
                ks_statistic: 0.0,
                ks_p_value: 0.0,
            }
        }
    };
    info!(
        family = fitted.dist.family(),
        ks = fitted.ks_statistic,
        p = fitted.ks_p_value,
        "distribution selected"
    );

    let config = SimulationConfig {
        horizon: args.days,
        rng_seed: args.seed,
        ..Default::default()
    };
    let run = run_simulation(&config, &catalog, &answers, &sample, fitted, None);
    let summary = summarize(run.days());

    println!(
        "Fit | family: {} | KS: {:.2} | p: {:.2} | sample: {} points",
        fitted.dist.family(),
        fitted.ks_statistic,
        fitted.ks_p_value,
        sample.len()
    );
    println!(
        "KPI | days: {}/{} | revenue: {:.2} EUR | profit: {:.2} EUR | mean demand: {:.1} | utilization: {:.1}%",
        summary.days,
        config.horizon,
        summary.total_revenue,
        summary.total_profit,
        summary.mean_demand,
        summary.mean_utilization * 100.0
    );
    if let Some(last) = run.days().last() {
        println!("Último día simulado (día {}):", last.day);
        for code in ["DE", "TPV", "TPPRO", "IT", "TG", "GT", "MB", "IPF"] {
            if let (Some(info), Some(value)) = (sim_core::catalog::lookup(code), last.get(code)) {
                println!("  {:<6} {:<40} {:>12.2} {}", code, info.name, value, info.unit);
            }
        }
    }

    if let Some(path) = &args.csv {
        export_csv(path, run.days())?;
    }
    if let Some(path) = &args.json {
        std::fs::write(path, serde_json::to_string_pretty(run.days())?)
            .with_context(|| format!("writing {path}"))?;
        println!("Exported {} days to '{}'", run.days().len(), path);
    }
    Ok(())
}
