#![forbid(unsafe_code)]

//! Two sibling elements, each with an empty placeholder `Signature`; the
//! second one is signed and verified in memory and after a reparse.
//!
//! Run with `cargo run --example siblings`.

use ulriksdal::core::{ns, Error};
use ulriksdal::dsig::{self, DsigContext, SignatureOptions, SignatureSelector};
use ulriksdal::keys::{Key, KeyData, KeyUsage, KeysManager};
use ulriksdal::transforms::occurrence_index;
use ulriksdal::xml;

const XML: &str = concat!(
    r#"<xml><a ID="foo"><content>foo-content</content><Signature xmlns="http://www.w3.org/2000/09/xmldsig#" /></a>"#,
    r#"<a ID="bar"><content>bar-content</content><Signature xmlns="http://www.w3.org/2000/09/xmldsig#" /></a></xml>"#,
);

fn main() -> Result<(), Error> {
    let private = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
        .map_err(|e| Error::Crypto(format!("RSA key generation failed: {e}")))?;
    let public = private.to_public_key();
    let mut keys = KeysManager::new();
    keys.add_key(Key::new(
        KeyData::Rsa { private: Some(private), public },
        KeyUsage::Any,
    ));
    let ctx = DsigContext::new(keys);

    let mut doc = xml::parse(XML)?;
    let signature = dsig::sign(&ctx, &mut doc, "bar", &SignatureOptions::default())?;

    let bar = ctx.id_map(&doc).resolve("bar")?;
    println!(
        "occurrence of the new signature: {} within #bar, {} in the document",
        occurrence_index(&doc, bar, signature)?,
        occurrence_index(&doc, doc.root(), signature)?,
    );

    let selector = SignatureSelector::ChildOf("bar".into());
    println!("in memory: {:?}", dsig::verify(&ctx, &doc, &selector)?);

    let serialized = doc.to_xml();
    println!("{serialized}");
    let reparsed = xml::parse(&serialized)?;
    println!(
        "signatures after reparse: {}",
        reparsed.get_elements_by_tag_name_ns(ns::DSIG, ns::node::SIGNATURE).len()
    );
    println!("after reparse: {:?}", dsig::verify(&ctx, &reparsed, &selector)?);
    Ok(())
}
