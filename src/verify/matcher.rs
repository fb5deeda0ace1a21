//! Recipient matcher: decide validity and uniqueness of extracted recipients.
//!
//! ## Rules
//!
//! 1. `Publicity` is coerced with the strict allow-list; anything else
//!    defaults to `false` and is reported.
//! 2. A non-empty recipient list makes `unique_recipient` provisionally `true`.
//! 3. Recipients are valid when **every** address is non-empty and scores at
//!    least `address_threshold` against the reference address.
//! 4. Only valid recipients populate `First_recipient` (organisation + space
//!    + personal name of the first entry) and `Recipients` (the entries as
//!    the model sent them).
//! 5. With more than one valid recipient, `unique_recipient` is `true` only if
//!    every identity (name followed by organisation) scores at least
//!    `identity_threshold` against the first recipient's identity.
//!
//! The matcher is infallible: shape problems become [`CoercionError`]
//! diagnostics and the affected field keeps its default.

use crate::config::MatchSettings;
use crate::error::CoercionError;
use crate::verify::fuzzy::token_set_ratio;
use crate::verify::model::{MatchVerdict, ParsedAnalysis, RecipientRecord};
use tracing::{debug, warn};

/// Compute the verdict for `parsed`, logging every coercion problem.
pub fn verify(parsed: &ParsedAnalysis, settings: &MatchSettings) -> MatchVerdict {
    let (verdict, warnings) = verify_with_diagnostics(parsed, settings);
    for w in &warnings {
        warn!("Coercion: {}", w);
    }
    verdict
}

/// Compute the verdict for `parsed` and return the coercion problems met.
pub fn verify_with_diagnostics(
    parsed: &ParsedAnalysis,
    settings: &MatchSettings,
) -> (MatchVerdict, Vec<CoercionError>) {
    let mut warnings = Vec::new();
    let mut verdict = MatchVerdict {
        publicity: parsed.coerce_publicity().unwrap_or_else(|e| {
            warnings.push(e);
            false
        }),
        ..MatchVerdict::default()
    };

    let recipients = parsed.recipients(&mut warnings);
    if recipients.is_empty() {
        return (verdict, warnings);
    }
    verdict.unique_recipient = Some(true);

    let addresses_match = recipients
        .iter()
        .all(|r| address_matches(r, &settings.reference_address, settings.address_threshold));
    if !addresses_match {
        debug!(
            "{} recipient(s), at least one address does not match the reference",
            recipients.len()
        );
        return (verdict, warnings);
    }

    verdict.valid_recipients = true;
    verdict.first_recipient = Some(recipients[0].label());
    if recipients.len() > 1 {
        verdict.unique_recipient = Some(same_addressee(&recipients, settings.identity_threshold));
    }
    verdict.recipients = parsed.raw_recipients().cloned();

    (verdict, warnings)
}

/// An empty address never matches, whatever the threshold.
fn address_matches(recipient: &RecipientRecord, reference: &str, threshold: u8) -> bool {
    let address = recipient.adresse_destinataire.trim();
    if address.is_empty() {
        return false;
    }
    let score = token_set_ratio(address, reference);
    debug!("Address {:?} scored {} (threshold {})", address, score, threshold);
    score >= threshold
}

/// Every identity must be close enough to the first recipient's identity.
fn same_addressee(recipients: &[RecipientRecord], threshold: u8) -> bool {
    let reference = recipients[0].identity();
    recipients.iter().all(|r| {
        let score = token_set_ratio(&r.identity(), &reference);
        debug!("Identity {:?} scored {} (threshold {})", r.identity(), score, threshold);
        score >= threshold
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::parser::extract_json;

    const REFERENCE: &str = "60 RUE FRANCOIS 1ER 75008 PARIS";

    fn settings() -> MatchSettings {
        MatchSettings::new(REFERENCE)
    }

    fn run(json: &str) -> (MatchVerdict, Vec<CoercionError>) {
        verify_with_diagnostics(&extract_json(json).unwrap(), &settings())
    }

    #[test]
    fn empty_recipients_keep_defaults() {
        let (v, w) = run(r#"{"Publicity": "True", "destinataires": []}"#);
        assert_eq!(
            v,
            MatchVerdict {
                publicity: true,
                ..MatchVerdict::default()
            }
        );
        assert!(w.is_empty());
    }

    #[test]
    fn single_matching_recipient() {
        let (v, _) = run(
            r#"{"Publicity": "False", "destinataires": [{"organisme_destinataire":"ACME","nom_personnel_destinataire":"JOHN","adresse_destinataire":"60 RUE FRANCOIS 1ER 75008 PARIS"}]}"#,
        );
        assert!(!v.publicity);
        assert!(v.valid_recipients);
        assert_eq!(v.unique_recipient, Some(true));
        assert_eq!(v.first_recipient.as_deref(), Some("ACME JOHN"));
        assert_eq!(v.recipients.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn empty_address_fails_even_at_zero_threshold() {
        let parsed = extract_json(
            r#"{"Publicity": "False", "destinataires": [{"organisme_destinataire":"ACME","nom_personnel_destinataire":"JOHN","adresse_destinataire":""}]}"#,
        )
        .unwrap();
        let lenient = MatchSettings {
            address_threshold: 0,
            ..settings()
        };
        let v = verify(&parsed, &lenient);
        assert!(!v.valid_recipients);
        assert_eq!(v.unique_recipient, Some(true));
        assert_eq!(v.recipients, None);
        assert_eq!(v.first_recipient, None);
    }

    #[test]
    fn one_bad_address_invalidates_all() {
        let (v, _) = run(
            r#"{"Publicity": "False", "destinataires": [
                {"organisme_destinataire":"ACME","nom_personnel_destinataire":"","adresse_destinataire":"60 RUE FRANCOIS 1ER 75008 PARIS"},
                {"organisme_destinataire":"ACME","nom_personnel_destinataire":"","adresse_destinataire":"3 PLACE BELLECOUR 69002 LYON"}
            ]}"#,
        );
        assert!(!v.valid_recipients);
        assert_eq!(v.first_recipient, None);
    }

    #[test]
    fn null_address_fails_without_warning() {
        let (v, w) = run(
            r#"{"Publicity": "False", "destinataires": [{"organisme_destinataire":"ACME","nom_personnel_destinataire":"JOHN","adresse_destinataire":null}]}"#,
        );
        assert!(!v.valid_recipients);
        assert!(w.is_empty(), "{w:?}");
    }

    #[test]
    fn same_identity_is_unique() {
        let (v, _) = run(
            r#"{"Publicity": "False", "destinataires": [
                {"organisme_destinataire":"H2 CARS","nom_personnel_destinataire":"SAMIR GANTASSI","adresse_destinataire":"60 RUE FRANCOIS 1ER 75008 PARIS"},
                {"organisme_destinataire":"H2 CARS","nom_personnel_destinataire":"SAMIR GANTASSI","adresse_destinataire":"60 rue François 1er 75008 Paris France"}
            ]}"#,
        );
        assert!(v.valid_recipients);
        assert_eq!(v.unique_recipient, Some(true));
        assert_eq!(v.first_recipient.as_deref(), Some("H2 CARS SAMIR GANTASSI"));
    }

    #[test]
    fn different_identities_are_not_unique() {
        let (v, _) = run(
            r#"{"Publicity": "False", "destinataires": [
                {"organisme_destinataire":"ECLIPSE HOLDING","nom_personnel_destinataire":"REMI LEROY","adresse_destinataire":"60 RUE FRANCOIS 1ER 75008 PARIS"},
                {"organisme_destinataire":"PUUURPLE","nom_personnel_destinataire":"SEVERINE ROHR","adresse_destinataire":"60 RUE FRANCOIS 1ER 75008 PARIS"}
            ]}"#,
        );
        assert!(v.valid_recipients);
        assert_eq!(v.unique_recipient, Some(false));
        assert_eq!(v.recipients.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn bad_publicity_defaults_and_keeps_matching() {
        let (v, w) = run(
            r#"{"Publicity": "", "destinataires": [{"organisme_destinataire":"ACME","nom_personnel_destinataire":"JOHN","adresse_destinataire":"60 RUE FRANCOIS 1ER 75008 PARIS"}]}"#,
        );
        assert!(!v.publicity);
        assert!(v.valid_recipients);
        assert!(matches!(w[0], CoercionError::Publicity { .. }));
    }

    #[test]
    fn missing_name_fields_still_build_label() {
        let (v, w) = run(
            r#"{"Publicity": false, "destinataires": [{"adresse_destinataire":"60 RUE FRANCOIS 1ER 75008 PARIS"}]}"#,
        );
        assert!(v.valid_recipients);
        assert_eq!(v.first_recipient.as_deref(), Some(" "));
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn recipients_are_echoed_as_received() {
        let (v, w) = run(
            r#"{"Publicity": "False", "destinataires": [{"adresse_destinataire":"60 RUE FRANCOIS 1ER 75008 PARIS","nom_personnel_destinataire":null,"service":"COMPTA"}]}"#,
        );
        assert!(v.valid_recipients);
        assert_eq!(
            v.recipients,
            Some(vec![serde_json::json!({
                "adresse_destinataire": "60 RUE FRANCOIS 1ER 75008 PARIS",
                "nom_personnel_destinataire": null,
                "service": "COMPTA",
            })])
        );
        // Missing organisation and null name are still reported.
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn verify_is_deterministic() {
        let parsed = extract_json(
            r#"{"Publicity": "False", "destinataires": [
                {"organisme_destinataire":"MANZI AND CO","nom_personnel_destinataire":"","adresse_destinataire":"60 RUE FRANCOIS 1ER 75008 PARIS 08"},
                {"organisme_destinataire":"MANZI & CO","nom_personnel_destinataire":"","adresse_destinataire":"60 RUE FRANCOIS 1ER 75008 PARIS"}
            ]}"#,
        )
        .unwrap();
        let first = verify(&parsed, &settings());
        let second = verify(&parsed, &settings());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
