pub mod access_token;
pub mod credentials;

pub use access_token::AccessTokenProvider;
pub use credentials::{discover, CredentialSource, CredentialsError, DiscoveredCredentials, GoogleCredentials};
