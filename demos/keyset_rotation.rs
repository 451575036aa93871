//! Minimal example: rotating the primary key of an FPE keyset.
//!
//! Encrypts a record under a raw key, rotates to a prefixed key, and shows
//! that both ciphertexts still decrypt. Every call is audited to a file.
//! Run with: `cargo run --example keyset_rotation`
//! Set `RUST_LOG=fpeset=debug` to see per-key routing decisions.

use fpeset::audit::FileAuditSink;
use fpeset::registry::{self, FfxKeyType, KeyTemplate};
use fpeset::{Fpe, FpeParams, KeysetHandle, UnknownCharacterStrategy};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 1. Setup
    let registry = registry::register();
    let template = FfxKeyType::Ff31_256Alphanumeric.template();
    let mut handle = KeysetHandle::generate(registry, &template)?;
    let params = FpeParams::from(UnknownCharacterStrategy::Skip);

    let record = "Alice Liddell, 42 Rabbit Hole Lane";

    // 2. Encrypt under the original raw key
    let old_ct = handle.primitive(registry)?.encrypt_with(record.as_bytes(), &params)?;
    println!("raw key {:>10}: {}", handle.primary_id(), String::from_utf8_lossy(&old_ct));

    // 3. Rotate to a prefixed primary
    let new_id = handle.generate_key(registry, &KeyTemplate::tink(template.format.clone()))?;
    handle.set_primary(new_id)?;

    let fpe = handle.primitive(registry)?;
    let audit_path = std::env::temp_dir().join("fpeset_audit.jsonl");
    fpe.add_audit_sink(Box::new(FileAuditSink::new(&audit_path)?));

    let new_ct = fpe.encrypt_with(record.as_bytes(), &params)?;
    println!(
        "tink key {:>10}: {:02x?} + {}",
        new_id,
        &new_ct[..fpeset::PREFIX_LEN],
        String::from_utf8_lossy(&new_ct[fpeset::PREFIX_LEN..])
    );

    // 4. Both decrypt through the same keyset
    assert_eq!(fpe.decrypt_with(&new_ct, &params)?, record.as_bytes());
    assert_eq!(fpe.decrypt_with(&old_ct, &params)?, record.as_bytes());
    println!("both ciphertexts decrypt after rotation");

    // 5. Keyset metadata, safe to log
    println!("{}", serde_json::to_string_pretty(&handle.info())?);
    println!("Audit records written to: {}", audit_path.display());

    Ok(())
}
