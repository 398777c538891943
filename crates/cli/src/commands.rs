//! Subcommand implementations.
//!
//! Every command writes to a caller-supplied writer so it can be exercised
//! against in-memory buffers. Errors that map to a dedicated exit code are
//! wrapped in [`FieldError`].

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use common::protocol::BatchSummary;
use common::FieldError;
use fieldcrypt::crypto::FernetCipher;
use fieldcrypt::{open_record, seal_record, FieldCodec, FieldSpec, FieldValue, RecordFields};
use tracing::debug;

use crate::cli::BatchMode;

pub fn generate_key(out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", FernetCipher::generate_key())?;
    Ok(())
}

pub fn seal(codec: &FieldCodec, spec: &FieldSpec, value: &str, out: &mut impl Write) -> Result<()> {
    let stored = codec
        .prepare_for_storage(&FieldValue::from(value), spec)
        .map_err(FieldError::from)?;
    writeln!(out, "{}", stored.unwrap_or_default())?;
    Ok(())
}

/// Decrypt `stored`. Without `strict`, values that do not decrypt are
/// echoed back unchanged.
pub fn open(
    codec: &FieldCodec,
    spec: &FieldSpec,
    stored: &str,
    strict: bool,
    out: &mut impl Write,
) -> Result<()> {
    let value = if strict && !stored.is_empty() {
        let plaintext = codec.try_decrypt(stored, spec).map_err(FieldError::from)?;
        FieldValue::Text(plaintext)
    } else {
        codec.load_from_storage(Some(stored), spec)
    };
    let text = value.canonical_text().unwrap_or_default();
    writeln!(out, "{text}")?;
    Ok(())
}

/// Print the search hash of `value`; prints nothing for an empty value.
pub fn hash(codec: &FieldCodec, value: &str, out: &mut impl Write) -> Result<()> {
    if let Some(digest) = codec.search_hash(&FieldValue::from(value)) {
        writeln!(out, "{digest}")?;
    }
    Ok(())
}

/// Transform one JSON record per input line. Blank lines are skipped.
///
/// # Errors
///
/// Fails on the first line that is not JSON, or the first field that does
/// not fit its column when sealing. Records before that line have already
/// been written.
pub fn batch(
    codec: &FieldCodec,
    fields: &RecordFields,
    mode: BatchMode,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    for (idx, line) in input.lines().enumerate() {
        let line = line.context("failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let mut record: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("line {line_no}: record is not valid JSON"))?;

        let touched = match mode {
            BatchMode::Seal => seal_record(codec, &mut record, fields)
                .map_err(FieldError::from)
                .with_context(|| format!("line {line_no}: failed to seal record"))?,
            BatchMode::Open => open_record(codec, &mut record, fields),
        };
        debug!(line = line_no, fields = touched, "record processed");

        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;

        summary.records += 1;
        summary.fields += touched;
    }

    out.flush()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use common::protocol::{FieldDescriptor, FieldType, SealManifest};
    use common::DecryptionError;
    use fieldcrypt::KeyMaterial;
    use serde_json::{json, Value};

    use super::*;

    const KEY: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";

    fn codec() -> FieldCodec {
        FieldCodec::new(&KeyMaterial::new(KEY).unwrap()).unwrap()
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    fn manifest() -> RecordFields {
        RecordFields::from_manifest(&SealManifest {
            fields: vec![
                FieldDescriptor {
                    path: "family_name".into(),
                    field_type: FieldType::Char,
                    searchable: false,
                    max_length: None,
                    original_max_length: None,
                },
                FieldDescriptor {
                    path: "email".into(),
                    field_type: FieldType::Email,
                    searchable: true,
                    max_length: None,
                    original_max_length: None,
                },
            ],
        })
    }

    #[test]
    fn generated_key_is_usable() {
        let mut buf = Vec::new();
        generate_key(&mut buf).unwrap();
        let key = output(buf);
        assert!(KeyMaterial::new(key.trim())
            .and_then(|k| FieldCodec::new(&k))
            .is_ok());
    }

    #[test]
    fn seal_then_open() {
        let codec = codec();
        let spec = FieldSpec::char("family_name");

        let mut sealed = Vec::new();
        seal(&codec, &spec, "山田", &mut sealed).unwrap();
        let stored = output(sealed);

        let mut opened = Vec::new();
        open(&codec, &spec, stored.trim(), true, &mut opened).unwrap();
        assert_eq!(output(opened), "山田\n");
    }

    #[test]
    fn seal_searchable_is_stable() {
        let codec = codec();
        let spec = FieldSpec::email("email").searchable(true);
        let mut buf = Vec::new();
        seal(&codec, &spec, "test@example.com", &mut buf).unwrap();
        assert_eq!(output(buf), "Ksglc8AjABDI138U2xdjkQ7OhGZ241xMLv47vkY/6hY=\n");
    }

    #[test]
    fn seal_oversize_maps_to_config_exit_code() {
        let spec = FieldSpec::char("name").max_length(50);
        let err = seal(&codec(), &spec, "sensitive data", &mut Vec::new()).unwrap_err();
        let field_err = err.downcast_ref::<FieldError>().unwrap();
        assert_eq!(field_err.exit_code(), 78);
    }

    #[test]
    fn open_is_fail_open_unless_strict() {
        let codec = codec();
        let spec = FieldSpec::char("family_name");

        let mut buf = Vec::new();
        open(&codec, &spec, "not-base64!!!", false, &mut buf).unwrap();
        assert_eq!(output(buf), "not-base64!!!\n");

        let err = open(&codec, &spec, "not-base64!!!", true, &mut Vec::new()).unwrap_err();
        match err.downcast_ref::<FieldError>() {
            Some(FieldError::Decryption(DecryptionError::InvalidBase64)) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn hash_prints_digest_or_nothing() {
        let codec = codec();
        let mut buf = Vec::new();
        hash(&codec, "x", &mut buf).unwrap();
        assert_eq!(output(buf).trim().len(), 64);

        let mut empty = Vec::new();
        hash(&codec, "", &mut empty).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn batch_seal_then_open() {
        let codec = codec();
        let fields = manifest();
        let input = concat!(
            "{\"id\":1,\"family_name\":\"山田\",\"email\":\"test@example.com\"}\n",
            "\n",
            "{\"id\":2,\"family_name\":null}\n",
        );

        let mut sealed = Vec::new();
        let summary =
            batch(&codec, &fields, BatchMode::Seal, Cursor::new(input), &mut sealed).unwrap();
        assert_eq!(summary, BatchSummary { records: 2, fields: 3 });

        let sealed = output(sealed);
        let first: Value = serde_json::from_str(sealed.lines().next().unwrap()).unwrap();
        assert_eq!(first["email"], "Ksglc8AjABDI138U2xdjkQ7OhGZ241xMLv47vkY/6hY=");

        let mut opened = Vec::new();
        let summary =
            batch(&codec, &fields, BatchMode::Open, Cursor::new(sealed), &mut opened).unwrap();
        assert_eq!(summary, BatchSummary { records: 2, fields: 2 });

        let records: Vec<Value> = output(opened)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(
            records,
            vec![
                json!({"id": 1, "family_name": "山田", "email": "test@example.com"}),
                json!({"id": 2, "family_name": null}),
            ]
        );
    }

    #[test]
    fn batch_rejects_invalid_json_with_line_number() {
        let err = batch(
            &codec(),
            &manifest(),
            BatchMode::Seal,
            Cursor::new("{\"id\":1}\nnot json\n"),
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
