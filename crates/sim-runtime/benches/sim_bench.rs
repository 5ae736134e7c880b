use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_core::{Answer, AnswerValue, DemandSample, Distribution, FittedDistribution, VarCode};
use sim_equations::EquationCatalog;
use sim_runtime::{run_simulation, SimulationConfig};

fn inputs() -> (DemandSample, FittedDistribution, Vec<Answer>, EquationCatalog) {
    let values: Vec<f64> = (0..30)
        .map(|i| 650.0 + 200.0 * ((i as f64 * 0.9).sin()))
        .collect();
    let sample = DemandSample::new(values).unwrap();
    let (m, sd) = sim_stats::moments(sample.values());
    let fitted = FittedDistribution {
        dist: Distribution::Normal { mean: m, std_dev: sd },
        cdf_at_mean: 0.5,
        ks_statistic: 0.5,
        ks_p_value: 0.84,
    };
    let answers = vec![
        Answer {
            code: Some(VarCode::from("PVP")),
            question: "precio de venta".into(),
            answer: AnswerValue::Number(15.5),
        },
        Answer {
            code: Some(VarCode::from("CPD")),
            question: "clientes por día".into(),
            answer: AnswerValue::Number(85.0),
        },
        Answer {
            code: Some(VarCode::from("CPROD")),
            question: "capacidad de producción".into(),
            answer: AnswerValue::Number(900.0),
        },
    ];
    let catalog = EquationCatalog::from_yaml_str(
        r#"
equations:
  - area: sales
    output: TPV
    expression: "min(DE, 0.9 * CPROD)"
    depends: [DE, CPROD]
  - area: accounting
    output: IT
    expression: "TPV * PVP"
    depends: [TPV, PVP]
"#,
    )
    .unwrap();
    (sample, fitted, answers, catalog)
}

fn bench_run(c: &mut Criterion) {
    let (sample, fitted, answers, catalog) = inputs();
    let config = SimulationConfig { horizon: 90, ..Default::default() };
    c.bench_function("simulate 90 days", |b| {
        b.iter(|| {
            let run = run_simulation(
                black_box(&config),
                &catalog,
                &answers,
                &sample,
                fitted,
                None,
            );
            black_box(run.days().len())
        })
    });
}

criterion_group!(benches, bench_run);
criterion_main!(benches);
