//! Example: serializer strategies on nested records.
//!
//! Encodes the same Person record under the deep, shallow, and disabled
//! strategies, then once more with the strategy taken from
//! `TYPEWIRE_SERIALIZER_STRATEGY`.
//!
//! Run with: cargo run --bin nested-serializers

use typewire::config::encode_options_from_env;
use typewire::prelude::*;
use typewire_examples::person_registry;

fn sample() -> Record {
    Record::new("Person")
        .with("name", "john doe")
        .with("age", 30)
        .with(
            "address",
            Record::new("Address")
                .with("street", "123 main st")
                .with("city", "new york")
                .with("country", "usa"),
        )
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let registry = person_registry();
    let person = sample();

    for strategy in [
        SerializerStrategy::Deep,
        SerializerStrategy::Shallow,
        SerializerStrategy::None,
    ] {
        let converter = Converter::new(&registry, "Person")?
            .with_options(EncodeOptions::new(strategy));
        let wire = converter.encode(&person)?;
        println!("{strategy:?}: {:?}", wire.field("address"));
    }

    let converter = Converter::new(&registry, "Person")?.with_options(encode_options_from_env());
    println!("from env: {:?}", converter.encode(&person)?.field("address"));

    Ok(())
}
