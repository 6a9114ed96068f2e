/// Quick start: normalize a post with embedded relations, then send it back
use serde_json::json;
use tether::{MemoryStore, PayloadSerializer, SchemaRegistry, TetherConfig};

fn main() -> anyhow::Result<()> {
    let registry = SchemaRegistry::from_json(
        r#"{
        "types": [
            {
                "name": "post",
                "attributes": [{"name": "title"}, {"name": "created_at", "read_only": true}],
                "relationships": [
                    {"key": "author", "kind": "reference", "target": "user"},
                    {"key": "tags", "kind": "collection", "target": "tag", "inverse": "many"},
                    {"key": "subject", "kind": "polymorphic_reference", "target": "subject"}
                ]
            },
            {"name": "user"},
            {"name": "tag", "primary_key": "slug"},
            {"name": "photo"}
        ]
    }"#,
    )?;

    let mut store = MemoryStore::new(&registry);
    let serializer = PayloadSerializer::new(registry, TetherConfig::default());

    let wire = json!({
        "id": 1,
        "title": "Hello, graph",
        "created_at": "2024-05-01T12:00:00Z",
        "author": {"id": 7, "name": "Ada"},
        "tags": [{"slug": "rust", "label": "Rust"}, {"slug": "json", "label": "JSON"}],
        "subject": {"type": "photo", "id": 3, "url": "/photos/3.jpg"}
    });

    println!("=== Inbound ===");
    let post = serializer.normalize_single(&mut store, "post", wire)?;
    println!("{}", serde_json::to_string_pretty(&post)?);

    println!("\nGraph store now holds {} related entities:", store.len());
    for (type_name, id, record) in store.entities() {
        println!("  {}#{} {}", type_name, id, serde_json::to_string(record)?);
    }

    println!("\n=== Outbound ===");
    let record = serializer.materialize("post", &post)?;
    let back = serializer.serialize_record(&record)?;
    println!("{}", serde_json::to_string_pretty(&back)?);

    Ok(())
}
