//! Profile filter: first stage of the run pipeline.

use crate::descriptor::MigrationDescriptor;

/// Whether `descriptor` takes part in a run with `run_profiles`.
///
/// A migration without profiles belongs to every run. Otherwise it needs at
/// least one profile in common with the run, compared case-insensitively.
pub fn is_eligible<S: AsRef<str>>(descriptor: &MigrationDescriptor, run_profiles: &[S]) -> bool {
    profiles_intersect(descriptor.profiles().iter().map(String::as_str), run_profiles)
}

fn profiles_intersect<'a, S: AsRef<str>>(declared: impl Iterator<Item = &'a str>, run_profiles: &[S]) -> bool {
    let mut declared = declared.peekable();
    if declared.peek().is_none() {
        return true;
    }

    let run: Vec<String> = run_profiles.iter().map(|p| p.as_ref().to_lowercase()).collect();
    declared.any(|profile| run.contains(&profile.to_lowercase()))
}

/// Keep eligible descriptors, preserving discovery order.
pub fn filter_eligible<S: AsRef<str>>(descriptors: Vec<MigrationDescriptor>, run_profiles: &[S]) -> Vec<MigrationDescriptor> {
    descriptors
        .into_iter()
        .filter(|descriptor| {
            let eligible = is_eligible(descriptor, run_profiles);
            if !eligible {
                log::debug!(
                    "{} (v{}) is not in the current profile set",
                    descriptor.name(),
                    descriptor.version()
                );
            }
            eligible
        })
        .collect()
}
