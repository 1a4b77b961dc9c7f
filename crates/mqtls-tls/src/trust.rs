//! CA trust store built from a PEM bundle.

use std::path::Path;

use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;

use crate::error::TlsError;
use crate::key::read_file;

const BEGIN_MARKER: &[u8] = b"-----BEGIN ";

/// Trust anchors used to verify the server, replacing the platform roots.
#[derive(Debug, Clone)]
pub struct TrustStore {
    roots: RootCertStore,
    skipped: usize,
}

impl TrustStore {
    /// Read a CA bundle from `path`.
    ///
    /// Lenient on purpose: blocks that are not `CERTIFICATE`, carry headers,
    /// fail to decode or do not parse as a certificate are skipped, and the
    /// bundle is accepted as long as one anchor survives. A bundle with a
    /// damaged entry therefore loads with fewer anchors than its author
    /// intended; only the debug log shows how many were dropped.
    pub fn load(path: &Path) -> Result<Self, TlsError> {
        let bundle = read_file(path)?;
        let store = Self::from_pem_bundle(&bundle);
        if store.is_empty() {
            return Err(TlsError::InvalidTrustStore {
                path: path.to_path_buf(),
            });
        }
        tracing::debug!(
            path = %path.display(),
            accepted = store.len(),
            skipped = store.skipped,
            "Loaded CA bundle"
        );
        Ok(store)
    }

    fn from_pem_bundle(bundle: &[u8]) -> Self {
        let mut roots = RootCertStore::empty();
        let mut skipped = 0;
        for block in pem_blocks(bundle) {
            let Some(block) = block else {
                skipped += 1;
                continue;
            };
            if block.tag() != "CERTIFICATE" || block.headers().iter().next().is_some() {
                skipped += 1;
                continue;
            }
            if roots
                .add(CertificateDer::from(block.into_contents()))
                .is_err()
            {
                skipped += 1;
            }
        }
        Self { roots, skipped }
    }

    /// Number of trust anchors.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Blocks in the bundle that did not become trust anchors.
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    pub const fn roots(&self) -> &RootCertStore {
        &self.roots
    }
}

/// Every PEM block in `data`. A block that fails to decode yields `None`
/// without stopping the scan.
fn pem_blocks(data: &[u8]) -> impl Iterator<Item = Option<pem::Pem>> + '_ {
    let starts: Vec<usize> = data
        .windows(BEGIN_MARKER.len())
        .enumerate()
        .filter_map(|(i, w)| (w == BEGIN_MARKER).then_some(i))
        .collect();
    let ends: Vec<usize> = starts
        .iter()
        .skip(1)
        .copied()
        .chain(std::iter::once(data.len()))
        .collect();
    starts
        .into_iter()
        .zip(ends)
        .map(move |(start, end)| pem::parse(&data[start..end]).ok())
}
