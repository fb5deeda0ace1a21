//! Offline integration tests for the verification core.
//!
//! Everything here goes through the public API only and needs neither
//! pdfium nor an API key.

use domicile_verify::{
    analyze_and_verify, attach_metrics, extract_json, token_set_ratio, verify,
    verify_with_diagnostics, CoercionError, MatchSettings, MatchVerdict, Measurements, ParseError,
    ParsedAnalysis,
};
use serde_json::{json, Value};
use std::time::Duration;

const REFERENCE: &str = "60 RUE FRANCOIS 1ER 75008 PARIS";

fn settings() -> MatchSettings {
    MatchSettings::new(REFERENCE)
}

fn parsed(value: Value) -> ParsedAnalysis {
    ParsedAnalysis::new(value.as_object().cloned().expect("test value is an object"))
}

fn recipient(org: &str, name: &str, address: &str) -> Value {
    json!({
        "organisme_destinataire": org,
        "nom_personnel_destinataire": name,
        "adresse_destinataire": address,
    })
}

// ── Matcher properties ───────────────────────────────────────────────────

#[test]
fn empty_recipients_are_never_valid() {
    for publicity in [json!(true), json!("False"), json!(null)] {
        let v = verify(
            &parsed(json!({"Publicity": publicity, "destinataires": []})),
            &settings(),
        );
        assert!(!v.valid_recipients);
        assert_eq!(v.recipients, None);
        assert_eq!(v.first_recipient, None);
        assert_eq!(v.unique_recipient, None);
    }
}

#[test]
fn matching_addresses_are_valid() {
    let addresses = [
        REFERENCE,
        "60 rue François 1er 75008 Paris",
        "60, RUE FRANCOIS 1ER - 75008 PARIS CEDEX",
    ];
    for address in addresses {
        assert!(token_set_ratio(address, REFERENCE) >= 60, "{address}");
        let v = verify(
            &parsed(json!({"destinataires": [recipient("ACME", "JOHN", address)]})),
            &settings(),
        );
        assert!(v.valid_recipients, "{address} should match");
    }
}

#[test]
fn empty_address_is_never_valid() {
    for org in ["ACME", ""] {
        for threshold in [0u8, 60, 100] {
            let s = MatchSettings {
                address_threshold: threshold,
                ..settings()
            };
            let v = verify(
                &parsed(json!({"Publicity": "False", "destinataires": [recipient(org, "JOHN", "")]})),
                &s,
            );
            assert!(!v.valid_recipients, "org {org:?}, threshold {threshold}");
            assert_eq!(v.first_recipient, None);
        }
    }
}

#[test]
fn one_foreign_address_invalidates_all() {
    let v = verify(
        &parsed(json!({"destinataires": [
            recipient("ACME", "JOHN", REFERENCE),
            recipient("ACME", "JOHN", "12 AVENUE DES CHAMPS 69002 LYON"),
        ]})),
        &settings(),
    );
    assert!(!v.valid_recipients);
    assert_eq!(v.recipients, None);
}

#[test]
fn identical_identities_are_unique() {
    let v = verify(
        &parsed(json!({"destinataires": [
            recipient("ACME", "JOHN", REFERENCE),
            recipient("ACME", "JOHN", REFERENCE),
        ]})),
        &settings(),
    );
    assert!(v.valid_recipients);
    assert_eq!(v.unique_recipient, Some(true));
    assert_eq!(v.recipients.as_ref().map(Vec::len), Some(2));
}

#[test]
fn dissimilar_identities_are_not_unique() {
    let first = "JOHNACME";
    let second = "MARIE CURIEBOULANGERIE DUPONT";
    assert!(token_set_ratio(first, second) < 70);

    let v = verify(
        &parsed(json!({"destinataires": [
            recipient("ACME", "JOHN", REFERENCE),
            recipient("BOULANGERIE DUPONT", "MARIE CURIE", REFERENCE),
        ]})),
        &settings(),
    );
    assert!(v.valid_recipients);
    assert_eq!(v.unique_recipient, Some(false));
    assert_eq!(v.first_recipient.as_deref(), Some("ACME JOHN"));
}

#[test]
fn verify_is_idempotent() {
    let input = parsed(json!({"Publicity": "True", "destinataires": [
        recipient("ACME", "JOHN", REFERENCE),
        recipient("ACME SAS", "JOHN DOE", "60 rue francois 1er paris"),
    ]}));
    let first = verify(&input, &settings());
    let second = verify(&input, &settings());
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn thresholds_are_configurable() {
    let input = parsed(json!({"destinataires": [
        recipient("ACME", "JOHN", "60 RUE FRANCOIS 1ER 75009 PARIS"),
    ]}));
    let strict = MatchSettings {
        address_threshold: 100,
        ..settings()
    };
    let lax = MatchSettings {
        address_threshold: 0,
        ..settings()
    };
    assert!(!verify(&input, &strict).valid_recipients);
    assert!(verify(&input, &lax).valid_recipients);
}

// ── Parser ───────────────────────────────────────────────────────────────

#[test]
fn extract_json_examples() {
    let p = extract_json("blah {\"a\":1} blah").unwrap();
    assert_eq!(Value::Object(p.into_object()), json!({"a": 1}));

    assert_eq!(
        extract_json("no braces here").unwrap_err(),
        ParseError::NoJsonFound
    );
    assert!(matches!(
        extract_json("{not json}").unwrap_err(),
        ParseError::MalformedJson { .. }
    ));
}

#[test]
fn extract_json_from_markdown_fence() {
    let reply = "Here is the result:\n```json\n{\"Publicity\": true, \"destinataires\": []}\n```";
    let p = extract_json(reply).unwrap();
    assert_eq!(p.publicity(), Some(&json!(true)));
}

// ── Orchestrator scenarios ───────────────────────────────────────────────

#[test]
fn scenario_single_valid_recipient() {
    let raw = r#"{"Publicity": "False", "destinataires": [{"organisme_destinataire":"ACME","nom_personnel_destinataire":"JOHN","adresse_destinataire":"60 RUE FRANCOIS 1ER 75008 PARIS"}]}"#;
    let v = analyze_and_verify(raw, &settings()).unwrap();
    assert_eq!(
        v,
        MatchVerdict {
            publicity: false,
            valid_recipients: true,
            unique_recipient: Some(true),
            recipients: Some(vec![recipient("ACME", "JOHN", REFERENCE)]),
            first_recipient: Some("ACME JOHN".to_string()),
        }
    );

    let out = serde_json::to_value(&v).unwrap();
    assert_eq!(out["Publicity"], false);
    assert_eq!(out["Valid_recipients"], true);
    assert_eq!(out["unique_recipient"], true);
    assert_eq!(out["First_recipient"], "ACME JOHN");
    assert_eq!(out["Recipients"][0]["organisme_destinataire"], "ACME");
}

#[test]
fn scenario_advertising_without_recipients() {
    let v = analyze_and_verify(r#"{"Publicity": "True", "destinataires": []}"#, &settings()).unwrap();
    assert_eq!(
        serde_json::to_value(&v).unwrap(),
        json!({
            "Publicity": true,
            "Valid_recipients": false,
            "unique_recipient": null,
            "Recipients": null,
            "First_recipient": null,
        })
    );
}

#[test]
fn unusable_reply_is_not_an_error() {
    for raw in ["I cannot read this letter.", "{\"Publicity\": tru", "[1, 2, 3]"] {
        assert_eq!(
            analyze_and_verify(raw, &settings()).unwrap(),
            MatchVerdict::default(),
            "{raw:?}"
        );
    }
}

#[test]
fn metrics_are_merged_into_the_report() {
    let v = analyze_and_verify(r#"{"Publicity": "True", "destinataires": []}"#, &settings()).unwrap();
    let report = attach_metrics(
        v,
        &Measurements {
            conversion: Duration::from_millis(200),
            inference: Duration::from_secs(3),
            total: Duration::from_millis(3300),
            image_count: 1,
            tokens_used: 2000,
        },
        0.00001,
    );
    let out = serde_json::to_value(&report).unwrap();
    assert_eq!(out["Publicity"], true);
    assert_eq!(out["Speed"]["Number images"], 1);
    assert_eq!(out["Speed"]["Tokens used"], 2000);
    assert_eq!(out["Speed"]["Cost"], "0.020$");
}

// ── Coercion diagnostics ─────────────────────────────────────────────────

#[test]
fn malformed_fields_are_reported_not_fatal() {
    let (v, warnings) = verify_with_diagnostics(
        &parsed(json!({
            "Publicity": "yes",
            "destinataires": [
                {"organisme_destinataire": "ACME", "adresse_destinataire": REFERENCE},
                "not a recipient",
            ],
        })),
        &settings(),
    );
    assert!(!v.publicity);
    // The second entry has no address, so the document is not valid.
    assert!(!v.valid_recipients);
    assert!(warnings
        .iter()
        .any(|w| matches!(w, CoercionError::Publicity { .. })));
    assert!(warnings
        .iter()
        .any(|w| matches!(w, CoercionError::RecipientField { index: 0, .. })));
    assert!(warnings
        .iter()
        .any(|w| matches!(w, CoercionError::RecipientShape { index: 1, .. })));
}

#[test]
fn recipients_keep_missing_and_null_fields() {
    let raw = r#"{"Publicity": "False", "destinataires": [{"adresse_destinataire": "60 RUE FRANCOIS 1ER 75008 PARIS", "nom_personnel_destinataire": null}]}"#;
    let v = analyze_and_verify(raw, &settings()).unwrap();
    assert!(v.valid_recipients);
    assert_eq!(v.first_recipient.as_deref(), Some(" "));

    let out = serde_json::to_value(&v).unwrap();
    assert_eq!(
        out["Recipients"],
        json!([{"adresse_destinataire": REFERENCE, "nom_personnel_destinataire": null}])
    );
    assert!(out["Recipients"][0].get("organisme_destinataire").is_none());
}
