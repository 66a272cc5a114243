use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// The three-letter code of the currency every amount is billed in.
pub const CURRENCY_LABEL: &str = "EGP";

/// Everything a run can be tuned with. Every field has a default, so a configuration file
/// only needs the fields it changes (or can be omitted altogether).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceConfiguration {
    /// The spreadsheet with one row per session line.
    pub input_path: PathBuf,
    /// Where the consolidated spreadsheet, one row per tutor, is written.
    pub consolidated_table_path: PathBuf,
    /// The directory receiving one PDF invoice per tutor.
    pub output_directory: PathBuf,
    pub currency_label: String,
    /// The lines of the "To:" box, the party the invoices are addressed to.
    pub recipient_lines: Vec<String>,
    pub payment_method: String,
    pub fonts: FontPaths,
}

/// The font files, loaded once when the run starts.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FontPaths {
    pub regular: PathBuf,
    pub bold: PathBuf,
    pub serif: PathBuf,
}

impl Default for FontPaths {
    fn default() -> Self {
        FontPaths {
            regular: "fonts/NotoNaskhArabic-Regular.ttf".into(),
            bold: "fonts/NotoNaskhArabic-Bold.ttf".into(),
            serif: "fonts/NotoSerif-Bold.ttf".into(),
        }
    }
}

impl Default for InvoiceConfiguration {
    fn default() -> Self {
        InvoiceConfiguration {
            input_path: "tutorlist.xlsx".into(),
            consolidated_table_path: "consolidated_tutor_data.xlsx".into(),
            output_directory: "PDFs".into(),
            currency_label: CURRENCY_LABEL.into(),
            recipient_lines: vec![
                "Nagwa Limited".into(),
                "York House, 41 Sheet Street, Windsor, SL4 1DD".into(),
                "UNITED KINGDOM".into(),
            ],
            payment_method: "Transfer".into(),
            fonts: FontPaths::default(),
        }
    }
}

impl InvoiceConfiguration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    format!("Failed to read the configuration file {:?}", configuration_file_path),
                    &error,
                )
            })?;
        let configuration: InvoiceConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error(
                    format!("Failed to parse the configuration file {:?}", configuration_file_path),
                    &error,
                )
            })?;

        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_configuration_keeps_the_defaults() {
        let configuration: InvoiceConfiguration = serde_json::from_str(
            r#"{ "currencyLabel": "USD", "fonts": { "serif": "fonts/Serif.ttf" } }"#,
        )
        .unwrap();
        assert_eq!(configuration.currency_label, "USD");
        assert_eq!(configuration.fonts.serif, PathBuf::from("fonts/Serif.ttf"));
        assert_eq!(configuration.fonts.regular, FontPaths::default().regular);
        assert_eq!(configuration.output_directory, PathBuf::from("PDFs"));
    }

    #[test]
    fn reads_a_configuration_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("invoices.json");
        std::fs::write(&path, r#"{ "outputDirectory": "out/invoices" }"#).unwrap();

        let configuration = InvoiceConfiguration::from_path(&path).unwrap();
        assert_eq!(configuration.output_directory, PathBuf::from("out/invoices"));
        assert!(InvoiceConfiguration::from_path(&directory.path().join("missing.json")).is_err());
    }
}
