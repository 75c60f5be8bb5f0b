//! Stream-level properties of the normalizer

use trace_normalizer::{StructLog, TraceNormalizer};

const ROOT: &str = "0xa2b3391f7a85bf1ad08dc541a1b99da3c591c156351391f26ec88c557ff12134";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn step(pc: u64, op: u8) -> String {
    format!(
        r#"{{"pc":{pc},"op":{op},"gas":"0x{:x}","gasCost":"0x3","depth":1,"stack":["0x{:x}"]}}"#,
        100_000 - pc,
        pc * 7
    )
}

fn normalize(input: &str) -> anyhow::Result<String> {
    let mut out = Vec::new();
    TraceNormalizer::new("erigon").normalize(input.as_bytes(), &mut out);
    Ok(String::from_utf8(out)?)
}

#[test]
fn test_n_steps_then_one_trailer() -> anyhow::Result<()> {
    init_tracing();
    let mut input: Vec<String> = (1..=25).map(|pc| step(pc, 0x01)).collect();
    input.push(format!(r#"{{"stateRoot": "{ROOT}"}}"#));

    let out = normalize(&input.join("\n"))?;
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines.len(), 26);
    assert_eq!(lines[25], format!(r#"{{"stateRoot":"{ROOT}"}}"#));
    for (i, line) in lines[..25].iter().enumerate() {
        let log: StructLog = serde_json::from_str(line)?;
        assert_eq!(log.pc, i as u64 + 1, "order must be preserved");
    }
    Ok(())
}

#[test]
fn test_synthetic_stops_are_dropped() -> anyhow::Result<()> {
    init_tracing();
    let mut input = Vec::new();
    for pc in 1..=10 {
        input.push(step(pc, 0x60));
        if pc % 3 == 0 {
            input.push(step(pc, 0x00));
        }
    }

    let out = normalize(&input.join("\n"))?;
    assert_eq!(out.lines().count(), 11);
    assert!(!out.contains(r#""op":0,"#));
    Ok(())
}

#[test]
fn test_malformed_lines_do_not_change_output() -> anyhow::Result<()> {
    init_tracing();
    let valid: Vec<String> = (1..=8).map(|pc| step(pc, 0x01)).collect();
    let trailer = format!(r#"{{"stateRoot": "{ROOT}"}}"#);
    let garbage = [
        "erigon: warning, something happened",
        "{\"pc\":",
        r#"{"pc":"nope","depth":1}"#,
        "[1,2,3",
        "[7,96,100,3,1]",
    ];

    let mut clean = valid.clone();
    clean.push(trailer.clone());
    let expected = normalize(&clean.join("\n"))?;

    for k in 0..=garbage.len() {
        for offset in 0..valid.len() {
            let mut noisy = valid.clone();
            for (j, junk) in garbage[..k].iter().enumerate() {
                let at = (offset + j * 3).min(noisy.len());
                noisy.insert(at, junk.to_string());
            }
            noisy.push(trailer.clone());
            assert_eq!(normalize(&noisy.join("\n"))?, expected, "k={k} offset={offset}");
        }
    }
    Ok(())
}

#[test]
fn test_canonical_stream_is_a_fixed_point() -> anyhow::Result<()> {
    init_tracing();
    let mut input: Vec<String> = (1..=5).map(|pc| step(pc, 0x02)).collect();
    input.push(r#"{"pc":6,"op":253,"gas":6,"cost":0,"depth":2,"error":"execution reverted","memory":"0xAB00","returnData":"0x"}"#.to_string());
    input.push(format!(r#"{{"stateRoot": "{ROOT}"}}"#));

    let once = normalize(&input.join("\n"))?;
    let twice = normalize(&once)?;
    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn test_end_of_run_summary_is_not_a_step() -> anyhow::Result<()> {
    init_tracing();
    let input = [
        step(1, 0x01),
        r#"{"output":"","gasUsed":"0x2d1cc4","time":233624,"error":"gas uint64 overflow"}"#.to_string(),
    ]
    .join("\n");

    let out = normalize(&input)?;
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], r#"{"stateRoot":""}"#);
    Ok(())
}
