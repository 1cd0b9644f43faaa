//! Folding a batch into the prior package set.

use rpmrepo_rpm::models::{Nevra, Package};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A freshly parsed RPM and where it was uploaded.
#[derive(Debug)]
pub(crate) struct Incoming {
    pub key: PathBuf,
    pub package: Package,
    pub bytes: Vec<u8>,
}

/// An RPM that has to be copied to its published location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relocation {
    pub from: PathBuf,
    pub to: PathBuf,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub(crate) struct Merged {
    pub packages: BTreeMap<Nevra, Package>,
    pub relocations: Vec<Relocation>,
    /// Upload keys of content-addressed packages that turned out to be
    /// published already.
    pub discard: Vec<PathBuf>,
    pub added: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub removed: usize,
}

/// `(prior − remove) ∪ incoming`, keyed by NEVRA.
///
/// An incoming package identical (by checksum) to the one it would replace
/// is a no-op; otherwise it replaces it. Within the batch the last package
/// for a NEVRA wins.
pub(crate) fn merge(prior: Vec<Package>, remove: &[Nevra], incoming: Vec<Incoming>) -> Merged {
    let mut merged = Merged {
        packages: prior.into_iter().map(|package| (package.nevra.clone(), package)).collect(),
        ..Merged::default()
    };
    for nevra in remove {
        match merged.packages.remove(nevra) {
            Some(_) => merged.removed += 1,
            None => tracing::debug!(%nevra, "asked to remove a package that isn't published"),
        }
    }
    let published: BTreeMap<Nevra, Package> = merged.packages.clone();

    let mut relocations: BTreeMap<Nevra, Relocation> = BTreeMap::new();
    let mut changed: BTreeMap<Nevra, bool> = BTreeMap::new();
    for Incoming { key, package, bytes } in incoming {
        let nevra = package.nevra.clone();
        relocations.remove(&nevra);
        if let Some(existing) = published.get(&nevra)
            && existing.checksum == package.checksum
        {
            // Earlier packages of this batch with the same NEVRA lose too.
            merged.packages.insert(nevra.clone(), existing.clone());
            changed.remove(&nevra);
            // Only an upload that would have been relocated is ours to
            // remove; anything else is a file the user put there.
            if key.to_string_lossy() != package.location && key.to_string_lossy() != existing.location {
                merged.discard.push(key);
            }
            merged.unchanged += 1;
            continue;
        }
        if key.to_string_lossy() != package.location {
            relocations.insert(
                nevra.clone(),
                Relocation {
                    from: key,
                    to: PathBuf::from(&package.location),
                    bytes,
                },
            );
        }
        changed.insert(nevra.clone(), published.contains_key(&nevra));
        merged.packages.insert(nevra, package);
    }
    for replaced in changed.into_values() {
        match replaced {
            true => merged.replaced += 1,
            false => merged.added += 1,
        }
    }
    merged.relocations = relocations.into_values().collect();
    merged
}
