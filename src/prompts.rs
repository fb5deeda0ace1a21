//! Prompts for VLM-based recipient extraction.
//!
//! Every prompt lives here so the wording can change without touching retry
//! or matching logic, and so unit tests can inspect it without a model.
//!
//! The JSON keys requested below are the wire contract read by
//! [`crate::verify::model`]; renaming one here means renaming it there.
//!
//! Callers can override the prompt via
//! [`crate::config::VerificationConfig::system_prompt`].

/// Placeholder replaced by the configured reference address.
pub const ADDRESS_PLACEHOLDER: &str = "{reference_address}";

/// Extraction prompt template. Use [`extraction_prompt`] to fill it in.
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"You are given the scanned pages of one piece of mail received by a French domiciliation company. Classify the document and extract its recipient information.

Step 1 — RECIPIENTS
   - Look for the recipient address '{reference_address}' (spelling, accents, case and an added arrondissement such as 'PARIS 08' or 'France' may vary).
   - When it is present, extract the information written directly above it in the same address block:
     * the recipient's personal name (e.g. REMI LEROY, SAMIR GANTASSI),
     * the recipient organisation (e.g. SCI Au clair de la vue, H2 CARS, SAS 3DS CONSTRUCTION),
     * or both.
   - Drop civility prefixes from personal names: M., MR, MME, Mlle, Madame, Monsieur, M LE REPRESENTANT LEGAL.
   - Never report the domiciliation company itself as a recipient.
   - Report each distinct recipient block as its own entry.

Step 2 — ADVERTISING
   - If the reference address does not appear, decide whether the document is advertising.

OUTPUT FORMAT
   - Output ONLY one JSON object, no commentary and no code fences.
   - "Publicity" is the string "True" or "False".
   - "destinataires" is a list (possibly empty) of objects with the string keys
     "organisme_destinataire", "nom_personnel_destinataire", "adresse_destinataire".
   - Use "" for any value that is not present on the document.

Example with one recipient:
{"Publicity": "False", "destinataires": [{"organisme_destinataire": "H2 CARS", "nom_personnel_destinataire": "SAMIR GANTASSI", "adresse_destinataire": "60 RUE FRANCOIS 1ER 75008 PARIS"}]}

Example for advertising:
{"Publicity": "True", "destinataires": []}"#;

/// Build the extraction prompt for `reference_address`.
pub fn extraction_prompt(reference_address: &str) -> String {
    EXTRACTION_PROMPT_TEMPLATE.replace(ADDRESS_PLACEHOLDER, reference_address)
}
