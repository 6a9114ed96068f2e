/// Example: Processing paginated API responses
/// This simulates fetching three pages of a list endpoint and folding them into one graph
use serde_json::json;
use tether::{MemoryStore, PayloadSerializer, RelationshipDescriptor, SchemaRegistry, TetherConfig, TypeDescriptor};

fn main() -> anyhow::Result<()> {
    println!("=== Processing Paginated API Responses ===\n");

    let registry = SchemaRegistry::new()
        .with_type(
            TypeDescriptor::new("user")
                .with_relationship(RelationshipDescriptor::reference("country", "country")),
        )
        .with_type(TypeDescriptor::new("country").with_primary_key("code"));

    let mut store = MemoryStore::new(&registry);
    let serializer = PayloadSerializer::new(registry, TetherConfig::default());

    let pages = vec![
        json!({
            "count": 5,
            "previous": null,
            "next": "https://api.example.com/users/?page=2",
            "results": [
                {"id": 1, "name": "Alice", "country": {"code": "US", "name": "United States"}},
                {"id": 2, "name": "Bob", "country": {"code": "GB", "name": "United Kingdom"}}
            ]
        }),
        json!({
            "count": 5,
            "previous": "https://api.example.com/users/",
            "next": "https://api.example.com/users/?page=3",
            "results": [
                {"id": 3, "name": "Carol", "country": {"code": "CA", "name": "Canada"}},
                {"id": 4, "name": "Dave", "country": "US"}
            ]
        }),
        json!({
            "count": 5,
            "previous": "https://api.example.com/users/?page=2",
            "next": null,
            "results": [
                {"id": 5, "name": "Erin", "country": {"code": "GB", "name": "United Kingdom"}}
            ]
        }),
    ];

    for (i, page) in pages.into_iter().enumerate() {
        println!("Processing page {}...", i + 1);

        if let Some(meta) = serializer.extract_meta(&mut store, "user", &page)? {
            println!(
                "  page {}/{} (items {}-{} of {}, {} per page)",
                meta.page.current,
                meta.page.total,
                meta.items.first,
                meta.items.last,
                meta.items.total,
                meta.items.per_page.map_or("?".to_string(), |n| n.to_string()),
            );
        }

        let ids = serializer.push_many(&mut store, "user", page)?;
        println!("  stored users {:?}", ids);
    }

    println!("\nSummary:");
    println!("  Total users: {}", store.all("user").count());
    println!("  Total countries: {}", store.all("country").count());

    Ok(())
}
