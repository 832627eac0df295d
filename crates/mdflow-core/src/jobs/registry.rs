use std::collections::HashMap;

use super::record::FileRef;

pub type FieldValidatorFn = Box<dyn Fn(FileRef) -> Result<FileRef, String> + Send + Sync>;

/// Explicit mapping from exact input-field name to its validator.
///
/// Dispatch is by exact name match, assembled at startup. A field with no
/// registered validator passes through unchanged; the validation layer records
/// and logs that outcome so opt-in validation stays observable.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, FieldValidatorFn>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in validators for the standard tool inputs: structural
    /// proteins must be PDB files, small molecules SDF or MOL2.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("protein", require_extension(&["pdb"]));
        registry.register("small_molecule", require_extension(&["sdf", "mol2"]));
        registry
    }

    pub fn register(
        &mut self,
        field: impl Into<String>,
        validator: impl Fn(FileRef) -> Result<FileRef, String> + Send + Sync + 'static,
    ) {
        self.validators.insert(field.into(), Box::new(validator));
    }

    pub fn get(&self, field: &str) -> Option<&FieldValidatorFn> {
        self.validators.get(field)
    }

    pub fn registered_fields(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }
}

/// Builds a validator that accepts only the given file extensions
/// (case-insensitive).
pub fn require_extension(
    allowed: &[&str],
) -> impl Fn(FileRef) -> Result<FileRef, String> + Send + Sync + 'static {
    let allowed: Vec<String> = allowed.iter().map(|e| e.to_lowercase()).collect();
    move |file: FileRef| {
        let extension = file
            .filepath
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match extension {
            Some(ref ext) if allowed.contains(ext) => Ok(file),
            other => Err(format!(
                "expected one of [{}], got '{}'",
                allowed.join(", "),
                other.as_deref().unwrap_or("<none>")
            )),
        }
    }
}
