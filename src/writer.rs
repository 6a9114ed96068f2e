use crate::types::EntityId;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes graph-store records to JSON Lines files, one per entity type
pub struct EntityWriter<W: Write> {
    output_dir: PathBuf,
    writers: HashMap<String, W>,
}

impl EntityWriter<File> {
    /// Create a new EntityWriter that writes `<type>.jsonl` files into a directory
    pub fn new_file_writer<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create output directory")?;

        Ok(EntityWriter {
            output_dir: output_dir.as_ref().to_path_buf(),
            writers: HashMap::new(),
        })
    }

    /// Write records to their respective files
    pub fn write_records<'a, I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a EntityId, &'a Map<String, Value>)>,
    {
        for (type_name, _id, record) in records {
            if !self.writers.contains_key(type_name) {
                let path = self.output_dir.join(format!("{}.jsonl", type_name));
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("Failed to open file: {}", path.display()))?;
                self.writers.insert(type_name.to_string(), file);
            }

            let writer = self
                .writers
                .get_mut(type_name)
                .context("Writer missing for entity type")?;
            let json = serde_json::to_string(record)
                .context("Failed to serialize record")?;
            writeln!(writer, "{}", json)
                .context("Failed to write record")?;
        }
        Ok(())
    }

    /// Flush all writers
    pub fn flush(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush().context("Failed to flush writer")?;
        }
        Ok(())
    }
}

/// Writes records of every type to a single output, tagging each line with
/// `_entity_type` and `_entity_id`
pub struct SingleWriter<W: Write> {
    writer: W,
}

impl<W: Write> SingleWriter<W> {
    pub fn new(writer: W) -> Self {
        SingleWriter { writer }
    }

    pub fn write_records<'a, I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a EntityId, &'a Map<String, Value>)>,
    {
        for (type_name, id, record) in records {
            let mut data = record.clone();
            data.insert("_entity_type".to_string(), Value::String(type_name.to_string()));
            data.insert("_entity_id".to_string(), id.to_value());

            let json = serde_json::to_string(&data)
                .context("Failed to serialize record")?;
            writeln!(self.writer, "{}", json)
                .context("Failed to write record")?;
        }
        Ok(())
    }

    /// Write one untagged JSON value on its own line
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize value")?;
        writeln!(self.writer, "{}", json).context("Failed to write value")
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_writer() {
        let mut buffer = Vec::new();
        let mut writer = SingleWriter::new(&mut buffer);

        let record: Map<String, Value> = serde_json::from_value(json!({"id": 5, "name": "Alice"})).unwrap();
        let id = EntityId::Int(5);

        writer.write_records(vec![("user", &id, &record)]).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let line: Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(line["name"], "Alice");
        assert_eq!(line["_entity_type"], "user");
        assert_eq!(line["_entity_id"], 5);
    }

    #[test]
    fn test_entity_writer_one_file_per_type() {
        let dir = tempfile::tempdir().unwrap();
        let user: Map<String, Value> = serde_json::from_value(json!({"id": 5, "name": "Alice"})).unwrap();
        let other: Map<String, Value> = serde_json::from_value(json!({"id": 6, "name": "Bob"})).unwrap();
        let tag: Map<String, Value> = serde_json::from_value(json!({"slug": "rust"})).unwrap();
        let (five, six, rust) = (EntityId::Int(5), EntityId::Int(6), EntityId::from("rust"));

        let mut writer = EntityWriter::new_file_writer(dir.path().join("entities")).unwrap();
        writer
            .write_records(vec![("user", &five, &user), ("tag", &rust, &tag), ("user", &six, &other)])
            .unwrap();
        writer.flush().unwrap();

        let users = std::fs::read_to_string(dir.path().join("entities/user.jsonl")).unwrap();
        let lines: Vec<Value> = users.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines, vec![json!({"id": 5, "name": "Alice"}), json!({"id": 6, "name": "Bob"})]);

        let tags = std::fs::read_to_string(dir.path().join("entities/tag.jsonl")).unwrap();
        assert_eq!(tags, "{\"slug\":\"rust\"}\n");
    }
}
