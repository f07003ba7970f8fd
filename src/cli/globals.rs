use secrecy::SecretString;

/// Secrets taken from the command line; never printed.
#[derive(Clone)]
pub struct GlobalArgs {
    pub secret: SecretString,
    pub mail_api_key: Option<SecretString>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            mail_api_key: None,
        }
    }

    pub fn set_mail_api_key(&mut self, key: SecretString) {
        self.mail_api_key = Some(key);
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("secret", &"***")
            .field("mail_api_key", &self.mail_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}
