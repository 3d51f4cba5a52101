//! Migration discovery.
//!
//! Each [`MigrationSource`] lists its candidates; [`discover`] merges them into
//! descriptors. Candidates without version metadata are dropped silently, a
//! source that fails to enumerate fails the whole discovery.

mod list;
mod registered;

pub use list::ListSource;
pub use registered::{RegisteredMigration, RegisteredSource, instantiate, is_migration_registered, registered_migrations};

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::{MigrationCandidate, MigrationDescriptor};
use crate::errors::{MigrationError, Result};
use crate::logger::MigrationLogger;
use crate::options::DuplicateVersionPolicy;

/// Anything that can enumerate migration candidates.
pub trait MigrationSource: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    fn candidates(&self) -> Result<Vec<MigrationCandidate>>;
}

impl<S: MigrationSource + ?Sized> MigrationSource for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn candidates(&self) -> Result<Vec<MigrationCandidate>> {
        (**self).candidates()
    }
}

/// Collect descriptors from every source, in source order then candidate order.
pub fn discover(
    sources: &[Arc<dyn MigrationSource>],
    duplicates: DuplicateVersionPolicy,
    logger: &dyn MigrationLogger,
) -> Result<Vec<MigrationDescriptor>> {
    let mut descriptors = Vec::new();

    for source in sources {
        let candidates = source.candidates().map_err(|err| match err {
            MigrationError::Discovery { .. } => err,
            other => MigrationError::Discovery {
                source_name: source.name().to_string(),
                message: other.to_string(),
            },
        })?;

        let mut contributed = 0usize;
        let mut excluded = 0usize;
        for candidate in candidates {
            let MigrationCandidate {
                name,
                metadata,
                factory,
            } = candidate;

            match metadata {
                Some(metadata) => {
                    descriptors.push(MigrationDescriptor::new(name, metadata, source.name(), factory));
                    contributed += 1;
                }
                None => {
                    log::trace!("skipping candidate '{name}' from '{}': no version metadata", source.name());
                    excluded += 1;
                }
            }
        }

        log::debug!(
            "source '{}' contributed {contributed} migration(s), excluded {excluded}",
            source.name()
        );
    }

    check_duplicate_versions(&descriptors, duplicates, logger)?;

    Ok(descriptors)
}

fn check_duplicate_versions(
    descriptors: &[MigrationDescriptor],
    policy: DuplicateVersionPolicy,
    logger: &dyn MigrationLogger,
) -> Result<()> {
    let mut seen: HashMap<i64, &MigrationDescriptor> = HashMap::new();

    for descriptor in descriptors {
        if let Some(first) = seen.get(&descriptor.version()) {
            match policy {
                DuplicateVersionPolicy::Reject => {
                    return Err(MigrationError::DuplicateVersion {
                        version: descriptor.version(),
                        first: first.name().to_string(),
                        second: descriptor.name().to_string(),
                    });
                }
                DuplicateVersionPolicy::Warn => {
                    logger.write_warning(format_args!(
                        "{} and {} both declare version {}; they will run in discovery order",
                        first.name(),
                        descriptor.name(),
                        descriptor.version()
                    ));
                }
            }
        } else {
            seen.insert(descriptor.version(), descriptor);
        }
    }

    Ok(())
}
