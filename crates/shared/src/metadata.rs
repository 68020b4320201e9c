use ulid::Ulid;

pub const SYSTEM_ACTOR: &str = "system";

/// Who triggered an operation, as supplied by the identity provider.
#[derive(Clone, Debug)]
pub struct Metadata {
    pub id: String,
    pub trigger_by: Option<String>,
    pub trigger_email: Option<String>,
}

impl Metadata {
    pub fn new(
        trigger_by: impl Into<Option<String>>,
        trigger_email: impl Into<Option<String>>,
    ) -> Self {
        Self {
            id: Ulid::new().to_string(),
            trigger_by: trigger_by.into(),
            trigger_email: trigger_email.into(),
        }
    }

    pub fn by(trigger_by: impl Into<String>) -> Self {
        Self::new(Some(trigger_by.into()), None)
    }

    pub fn system() -> Self {
        Self::by(SYSTEM_ACTOR)
    }

    pub fn trigger_by(&self) -> crate::Result<String> {
        match self.trigger_by.to_owned() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => crate::bail!("Actor not found in metadata"),
        }
    }

    pub fn trigger_email(&self) -> String {
        self.trigger_email.to_owned().unwrap_or_default()
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new(None, None)
    }
}
