//! Shared fixtures for the integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document, Object, Stream};
use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509NameBuilder, X509};

pub const TEST_PASSPHRASE: &str = "123456";

/// Builds an in-memory PDF with `page_count` one-line text pages.
pub fn build_pdf(page_count: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for i in 0..page_count {
        let content = lopdf::content::Content {
            operations: vec![lopdf::content::Operation::new(
                "Tj",
                vec![Object::string_literal(format!("page {}", i + 1))],
            )],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    let kid_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => kid_count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Saves a fresh test PDF at `dir/name` and returns its path.
pub fn write_pdf(dir: &Path, name: &str, page_count: usize) -> PathBuf {
    let path = dir.join(name);
    build_pdf(page_count).save(&path).unwrap();
    path
}

/// Writes a self-signed PKCS#12 credential protected by [`TEST_PASSPHRASE`].
pub fn write_credential(dir: &Path) -> PathBuf {
    let rsa = Rsa::generate(2048).unwrap();
    let pkey = PKey::from_rsa(rsa).unwrap();
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "constancia test").unwrap();
    let name = name.build();
    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&pkey).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(7).unwrap())
        .unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();
    let cert = builder.build();

    let pkcs12 = Pkcs12::builder()
        .name("test")
        .pkey(&pkey)
        .cert(&cert)
        .build2(TEST_PASSPHRASE)
        .unwrap();
    let path = dir.join("credential.p12");
    fs::write(&path, pkcs12.to_der().unwrap()).unwrap();
    path
}
