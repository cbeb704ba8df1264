use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

// Falls back to the build profile when ENV is unset or unrecognised.
pub fn which() -> Environment {
    #[cfg(debug_assertions)]
    let default_env = Environment::Development;
    #[cfg(not(debug_assertions))]
    let default_env = Environment::Production;

    match env::var("ENV").as_deref() {
        Ok("dev") | Ok("development") => Environment::Development,
        Ok("prod") | Ok("production") => Environment::Production,
        _ => default_env,
    }
}
