use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod parsed;

use parsed::ParsedMigration;

/// Attach version and profile metadata to a migration type.
///
/// ```text
/// #[derive(Default, MigrationInfo)]
/// #[migration(version = 3, profiles = ["prod", "staging"])]
/// struct BackfillOwners;
/// ```
///
/// Generates `impl docmig::MigrationInfo` and, unless `register = false` is
/// given, submits the type to the inventory so `RegisteredSource` finds it.
/// Registered types must implement `Default`. `version` may be negative, and a
/// single profile can be given as `profile = "prod"`.
#[proc_macro_derive(MigrationInfo, attributes(migration))]
pub fn derive_migration_info(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedMigration::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}
