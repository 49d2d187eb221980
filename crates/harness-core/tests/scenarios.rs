use harness_core::{Connection, Error, Harness, HarnessConfig, Metadata, PinRef, SharedBom};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const TEMPLATES: &str = r#"
connectors:
  DB9:
    type: D-Sub
    subtype: female
    pincount: 9
cables:
  CAB1:
    wirecount: 3
    gauge: 0.25 mm2
  CAB2:
    wirecount: 3
"#;

fn build(connections: &str) -> harness_core::Result<Harness> {
    let yaml = format!("{TEMPLATES}connections:\n{connections}");
    let config = HarnessConfig::from_yaml_str(&yaml)?;
    Harness::build(&config, Metadata::new("scenario"))
}

#[test]
fn single_cable_between_two_connectors() {
    let harness = build("  - [DB9:P1, {'CAB1:': '1-3'}, DB9:P2]\n").unwrap();

    assert_eq!(
        harness.connectors.keys().collect::<Vec<_>>(),
        vec!["P1", "P2"]
    );
    assert!(harness.connectors.values().all(|c| c.template == "DB9"));
    assert_eq!(harness.cables.keys().collect::<Vec<_>>(), vec!["__CAB1_1"]);
    assert_eq!(harness.cables["__CAB1_1"].template, "CAB1");

    let expected: Vec<Connection> = (1..=3)
        .map(|wire| Connection {
            from: Some(PinRef::new("P1", 1)),
            via: PinRef::new("__CAB1_1", wire),
            to: Some(PinRef::new("P2", 1)),
        })
        .collect();
    assert_eq!(harness.connections, expected);

    let entries = harness.bom_aggregator().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].entry.description, "Connector, D-Sub, female, 9 pins");
    assert_eq!(entries[0].quantity, dec!(2));
    assert_eq!(entries[0].designators, vec!["P1", "P2"]);
    assert_eq!(entries[1].entry.description, "Cable, 3 x 0.25 mm2");
    assert_eq!(entries[1].quantity, Decimal::ONE);
    assert_eq!(entries[1].designators, vec!["__CAB1_1"]);
}

#[test]
fn two_cables_in_a_row() {
    let err = build("  - [['CAB1:'], ['CAB2:']]\n").unwrap_err();
    match err {
        Error::TypeAlternationViolation {
            designator,
            template,
            ..
        } => {
            assert_eq!(designator, "__CAB2_1");
            assert_eq!(template, "CAB2");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn two_bare_cable_tokens_have_no_connection_count() {
    let err = build("  - ['CAB1:', 'CAB2:']\n").unwrap_err();
    assert!(matches!(err, Error::MissingConnectionCount { set: 1 }));
}

#[test]
fn doubled_separator() {
    let err = build("  - ['A::B', {'CAB1:': [1]}]\n").unwrap_err();
    assert!(matches!(
        err,
        Error::AmbiguousSeparator { ref token, separator: ':' } if token == "A::B"
    ));
}

#[test]
fn disagreeing_pin_counts() {
    let err = build("  - [{X1: '1-4'}, {X2: '1-3'}]\n").unwrap_err();
    assert!(matches!(
        err,
        Error::ConnectionCountMismatch { set: 1, ref counts } if counts == &[4, 3]
    ));
    assert_eq!(
        err.to_string(),
        "all items in connection set 1 must reference the same number of connections (found 4 vs 3)"
    );
}

#[test]
fn bom_rows_follow_first_appearance_across_sets() {
    let harness = build(
        "  - [DB9:X1, {'CAB1:': '1-2'}, DB9:X2]\n  - [X2, {'CAB2:': [3]}, DB9:X3]\n",
    )
    .unwrap();

    let table = harness.bom();
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.rows[0][2], "3");
    assert_eq!(table.rows[0][4], "X1, X2, X3");
    assert_eq!(table.rows[1][4], "__CAB1_1");
    assert_eq!(table.rows[2][4], "__CAB2_1");
    assert_eq!(harness.connections.len(), 3);
}

#[test]
fn shared_bom_collects_successful_builds_only() {
    let shared = SharedBom::new();

    build("  - [DB9:P1, {'CAB1:': '1-3'}, DB9:P2]\n")
        .unwrap()
        .merge_into(&shared);
    let before = shared.snapshot();

    let failed = build("  - [DB9:P1, {'CAB1:': '1-3'}, DB9:P2, DB9:P3]\n");
    assert!(failed.is_err());
    if let Ok(harness) = failed {
        harness.merge_into(&shared);
    }
    assert_eq!(shared.snapshot(), before);

    build("  - [DB9:J1, {'CAB1:': '1-3'}]\n")
        .unwrap()
        .merge_into(&shared);

    let entries = shared.into_inner().entries();
    assert_eq!(entries[0].quantity, dec!(3));
    assert_eq!(entries[0].designators, vec!["P1", "P2", "J1"]);
    assert_eq!(entries[1].quantity, dec!(2));
    assert_eq!(entries[1].designators, vec!["__CAB1_1", "__CAB1_1"]);
}

#[test]
fn concurrent_merges_keep_every_build() {
    let shared = SharedBom::new();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                build("  - [DB9:P1, {'CAB1:': '1-3'}, DB9:P2]\n")
                    .unwrap()
                    .merge_into(&shared);
            });
        }
    });

    let entries = shared.into_inner().entries();
    assert_eq!(entries[0].quantity, dec!(8));
    assert_eq!(entries[1].quantity, dec!(4));
}

#[test]
fn bom_csv_output() {
    let yaml = format!(
        "{TEMPLATES}connections:\n  - [DB9:P1, {{'CAB1:': '1-3'}}, DB9:P2]\n\
         additional_bom_items:\n  - {{description: Cable tie, qty: 2, unit: pcs, pn: CT-100}}\n"
    );
    let config = HarnessConfig::from_yaml_str(&yaml).unwrap();
    let harness = Harness::build(&config, Metadata::new("csv")).unwrap();

    let mut out = Vec::new();
    harness.bom().write_csv(&mut out).unwrap();
    insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r#"
    Id,Description,Qty,Unit,Designators,P/N
    1,"Connector, D-Sub, female, 9 pins",2,,"P1, P2",
    2,"Cable, 3 x 0.25 mm2",1,,__CAB1_1,
    3,Cable tie,2,pcs,,CT-100
    "#);
}
