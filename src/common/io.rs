//! Common, IO-related code.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use flate2::{bufread::MultiGzDecoder, write::GzEncoder, Compression};
use serde::{de::DeserializeOwned, Serialize};

/// Transparently open a file with gzip decoder.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let file = File::open(path)?;
        let bufreader = BufReader::new(file);
        let decoder = MultiGzDecoder::new(bufreader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        let file = File::open(path).map(BufReader::new)?;
        Ok(Box::new(file))
    }
}

/// Transparently open a file with gzip encoder.
pub fn open_write_maybe_gz<P>(path: P) -> Result<Box<dyn Write>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for writing", path.as_ref());
        let file = File::create(path)?;
        let bufwriter = BufWriter::new(file);
        let encoder = GzEncoder::new(bufwriter, Compression::default());
        Ok(Box::new(encoder))
    } else {
        tracing::trace!("Opening {:?} as plain text for writing", path.as_ref());
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Read all records from a JSON Lines file, skipping blank lines.
pub fn read_jsonl<T, P>(path: P) -> Result<Vec<T>, anyhow::Error>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let reader = open_read_maybe_gz(path.as_ref())?;
    let mut result = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            anyhow::anyhow!(
                "could not decode line {} of {:?}: {}",
                lineno + 1,
                path.as_ref(),
                e
            )
        })?;
        result.push(record);
    }
    Ok(result)
}

/// Write records as JSON Lines.
pub fn write_jsonl<T, W>(writer: &mut W, records: &[T]) -> Result<(), anyhow::Error>
where
    T: Serialize,
    W: Write + ?Sized,
{
    for record in records {
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Load a single JSON document from `path`.
pub fn read_json<T, P>(path: P) -> Result<T, anyhow::Error>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let reader = open_read_maybe_gz(path.as_ref())?;
    serde_json::from_reader(reader)
        .map_err(|e| anyhow::anyhow!("could not decode {:?}: {}", path.as_ref(), e))
}

#[cfg(test)]
mod test {
    use std::io::Read;

    use pretty_assertions::assert_eq;

    #[rstest::rstest]
    #[case(true)]
    #[case(false)]
    fn jsonl_through_maybe_gz(#[case] is_gzip: bool) -> Result<(), anyhow::Error> {
        let filename = if is_gzip { "test.jsonl.gz" } else { "test.jsonl" };
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join(filename);

        let records = vec![
            serde_json::json!({"gene": "TP53"}),
            serde_json::json!({"gene": "FLT3"}),
        ];
        {
            let mut f = super::open_write_maybe_gz(&path)?;
            super::write_jsonl(&mut f, &records)?;
        }

        let back: Vec<serde_json::Value> = super::read_jsonl(&path)?;
        assert_eq!(back, records);

        let mut raw = Vec::new();
        std::fs::File::open(&path)?.read_to_end(&mut raw)?;
        // gzip magic bytes
        assert_eq!(raw.starts_with(&[0x1f, 0x8b]), is_gzip);

        Ok(())
    }

    #[test]
    fn read_jsonl_reports_line_number() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("broken.jsonl");
        std::fs::write(&path, "{\"a\": 1}\n\n{not json\n")?;

        let err = super::read_jsonl::<serde_json::Value, _>(&path).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);

        Ok(())
    }
}
