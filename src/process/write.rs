//! Canonical silver output: gzip-compressed, semicolon-delimited, header
//! first. Rows stream straight through the encoder; nothing is buffered
//! beyond the current line.
//!
//! Fields are written verbatim with no quoting, so a source field containing
//! a `;` would corrupt the record. Known limitation of the format, shared
//! with every reader downstream.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::normalize::CanonicalRow;
use super::schema::{TableSchema, CANONICAL_DELIMITER};
use crate::error::Result;

pub struct CanonicalWriter<W: Write> {
    encoder: GzEncoder<W>,
}

impl<W: Write> CanonicalWriter<W> {
    /// Wrap `sink` in a gzip stream and write the header row from the
    /// schema, in column order.
    pub fn new(sink: W, schema: &TableSchema) -> Result<Self> {
        let mut encoder = GzEncoder::new(sink, Compression::default());
        write_joined(&mut encoder, &schema.columns)?;
        Ok(Self { encoder })
    }

    pub fn write_row(&mut self, row: &CanonicalRow) -> Result<()> {
        write_joined(&mut self.encoder, &row.fields)
    }

    /// Flush the gzip trailer and hand back the sink.
    pub fn finish(self) -> Result<W> {
        Ok(self.encoder.finish()?)
    }
}

fn write_joined<W: Write>(out: &mut W, fields: &[String]) -> Result<()> {
    let mut first = true;
    for field in fields {
        if !first {
            write!(out, "{}", CANONICAL_DELIMITER)?;
        }
        out.write_all(field.as_bytes())?;
        first = false;
    }
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn gunzip(bytes: &[u8]) -> String {
        let mut out = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut out)
            .expect("valid gzip");
        out
    }

    #[test]
    fn writes_header_then_rows() -> Result<()> {
        let schema = TableSchema::sniff("Code Postal|Valeur Fonciere|Date Mutation|A|B|C|D");
        let mut writer = CanonicalWriter::new(Vec::new(), &schema)?;
        writer.write_row(&CanonicalRow {
            fields: vec![
                "75001".into(),
                "150000.5".into(),
                "01/01/2024".into(),
                "a".into(),
                "b".into(),
                "c".into(),
                "d".into(),
            ],
        })?;
        let bytes = writer.finish()?;
        assert_eq!(
            gunzip(&bytes),
            "code_postal;valeur_fonciere;date_mutation;a;b;c;d\n\
             75001;150000.5;01/01/2024;a;b;c;d\n"
        );
        Ok(())
    }

    #[test]
    fn output_is_deterministic() -> Result<()> {
        let schema = TableSchema::sniff("a|b|c|d|e|f|g");
        let row = CanonicalRow {
            fields: (0..7).map(|i| i.to_string()).collect(),
        };
        let render = |schema: &TableSchema| -> Result<Vec<u8>> {
            let mut w = CanonicalWriter::new(Vec::new(), schema)?;
            w.write_row(&row)?;
            w.finish()
        };
        assert_eq!(render(&schema)?, render(&schema)?);
        Ok(())
    }
}
