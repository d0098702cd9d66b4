/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::config::Config;
use crate::env_config::{EnvConfig, StaticKeys};
use crate::error::SessionError;
use crate::handlers::{validate_parameters_handler, Handlers, VALIDATE_PARAMETERS_HANDLER};
use crate::shared_config::{self, SharedConfig};
use cos_auth::CredentialsCache;
use cos_auth_providers::assume_role::{AssumeRoleProvider, SharedMfaTokenProvider, SharedRoleAssumer};
use cos_auth_providers::chain::ChainProvider;
use cos_auth_providers::diagnostic::DiagnosticProvider;
use cos_auth_providers::ibm::{
    EnvironmentProvider, SharedConfigFileProvider, SharedCredentialsFileProvider,
    ENV_PROVIDER_NAME, SHARED_CONFIG_PROVIDER_NAME as IBM_SHARED_CONFIG_PROVIDER_NAME,
    SHARED_CREDENTIALS_PROVIDER_NAME,
};
use cos_auth_providers::provider_config::ProviderConfig;
use cos_auth_providers::static_keys::{
    StaticKeyProvider, ENV_CONFIG_PROVIDER_NAME, SHARED_CONFIG_PROVIDER_NAME,
};
use cos_endpoint::{add_scheme, EndpointOptions, ResolveEndpoint, ResolvedEndpoint, SharedEndpointResolver};
use cos_hyper::{HyperClient, SharedHttpClient};
use cos_sig_auth::middleware::SigningStage;
use cos_sig_auth::signer::RequestSigner;
use cos_types::credential::SharedCredentialsProvider;
use cos_types::profile::ProfileFiles;
use cos_types::{Region, SigningRegion, SigningService};

const CREDENTIAL_SOURCE_ENVIRONMENT: &str = "Environment";

/// Whether the shared config file (`~/.aws/config`) is loaded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SharedConfigState {
    /// Follow `AWS_SDK_LOAD_CONFIG`
    FromEnv,
    Disable,
    /// Load the shared config file, and honor `AWS_DEFAULT_REGION` and `AWS_DEFAULT_PROFILE`
    Enable,
}

impl Default for SharedConfigState {
    fn default() -> Self {
        SharedConfigState::FromEnv
    }
}

/// Controls how a [`Session`] is created
///
/// ```rust
/// use cos_session::{Config, Options, SharedConfigState};
/// use cos_types::Region;
/// let options = Options::default()
///     .config(Config::builder().region(Region::new("us-south")).build())
///     .profile("analytics")
///     .shared_config_state(SharedConfigState::Enable);
/// ```
#[derive(Debug, Default)]
pub struct Options {
    config: Config,
    profile: Option<String>,
    shared_config_state: SharedConfigState,
    shared_config_files: Option<ProfileFiles>,
    assume_role_token_provider: Option<SharedMfaTokenProvider>,
    role_assumer: Option<SharedRoleAssumer>,
    custom_ca_bundle: Option<Vec<u8>>,
    provider_config: Option<ProviderConfig>,
}

impl Options {
    /// Settings that take precedence over the environment and the shared files
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use this profile instead of `AWS_PROFILE` (or `AWS_DEFAULT_PROFILE`) or `default`
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn shared_config_state(mut self, state: SharedConfigState) -> Self {
        self.shared_config_state = state;
        self
    }

    /// Load exactly these files, in order, instead of the default config and credentials files
    pub fn shared_config_files(mut self, files: ProfileFiles) -> Self {
        self.shared_config_files = Some(files);
        self
    }

    /// Source of MFA codes for profiles that assume a role with `mfa_serial`
    pub fn assume_role_token_provider(mut self, provider: SharedMfaTokenProvider) -> Self {
        self.assume_role_token_provider = Some(provider);
        self
    }

    /// Service used to assume the role of a profile with `role_arn`
    pub fn role_assumer(mut self, assumer: SharedRoleAssumer) -> Self {
        self.role_assumer = Some(assumer);
        self
    }

    /// PEM certificates trusted instead of the system roots
    ///
    /// Takes precedence over the file named by `AWS_CA_BUNDLE`.
    pub fn custom_ca_bundle(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.custom_ca_bundle = Some(pem.into());
        self
    }

    /// Environment, filesystem, time source and token manager factory used while resolving
    /// credentials
    pub fn provider_config(mut self, config: ProviderConfig) -> Self {
        self.provider_config = Some(config);
        self
    }
}

/// Configuration and handlers shared by every client created from it
///
/// A session is created once from explicit settings, the environment and the shared files.
/// Clients get their own copy through [`client_config`](Session::client_config).
///
/// Credentials are resolved in this order:
/// 1. credentials set on the [`Config`]
/// 2. IBM IAM API keys from the environment, the shared credentials file, then the shared
///    config file
/// 3. `credential_source = Environment` in the profile (shared config enabled)
/// 4. HMAC keys from the environment
/// 5. `role_arn` with `source_profile` in the profile (shared config enabled)
/// 6. HMAC keys from the profile
/// 7. a chain that fails, explaining which sources were tried
#[derive(Clone, Debug)]
pub struct Session {
    config: Config,
    handlers: Handlers,
}

/// Everything a service client needs
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub config: Config,
    pub handlers: Handlers,
    pub endpoint: String,
    pub signing_region: Option<SigningRegion>,
    pub signing_name: Option<SigningService>,
    pub signing_name_derived: bool,
}

impl ClientConfig {
    fn new(session: Session, resolved: ResolvedEndpoint) -> Self {
        ClientConfig {
            config: session.config,
            handlers: session.handlers,
            endpoint: resolved.url,
            signing_region: resolved.signing_region,
            signing_name: resolved.signing_name,
            signing_name_derived: resolved.signing_name_derived,
        }
    }

    /// Stage that authenticates this client's requests, `None` without credentials
    pub fn signing_stage(&self, signer: RequestSigner) -> Option<SigningStage> {
        self.config
            .credentials()
            .map(|credentials| SigningStage::new(credentials.clone(), signer))
    }
}

impl Session {
    /// Session from `config`, the environment and the shared files
    pub fn new(config: Config) -> Result<Self, SessionError> {
        Self::with_options(Options::default().config(config))
    }

    pub fn with_options(options: Options) -> Result<Self, SessionError> {
        let provider_config = options.provider_config.clone().unwrap_or_default();
        let env = provider_config.env();
        let mut env_config = match options.shared_config_state {
            SharedConfigState::FromEnv => EnvConfig::load(&env),
            SharedConfigState::Enable => EnvConfig::load_shared(&env),
            SharedConfigState::Disable => EnvConfig::load_unshared(&env),
        };
        if let Some(profile) = options.profile.as_ref().filter(|p| !p.is_empty()) {
            env_config.profile = profile.clone();
        }

        let ca_bundle = match (&options.custom_ca_bundle, &env_config.custom_ca_bundle) {
            (Some(pem), _) => Some(pem.clone()),
            (None, Some(path)) => Some(provider_config.fs().read_to_end(path).map_err(|err| {
                SessionError::ca_bundle("failed to open custom CA bundle PEM file", err)
            })?),
            (None, None) => None,
        };

        new_session(&options, &env_config, provider_config, ca_bundle)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut Handlers {
        &mut self.handlers
    }

    /// A copy of this session with `overrides` merged into its config
    ///
    /// Handlers are copied too, so changes to the copy never reach this session.
    pub fn copy(&self, overrides: &[Config]) -> Session {
        let mut session = Session {
            config: self.config.copy(overrides),
            handlers: self.handlers.clone(),
        };
        session.init_handlers();
        session
    }

    /// Client configuration for `service`
    ///
    /// An endpoint set on the config is used as is (with a scheme added when missing) and is
    /// signed for the configured region. Otherwise the endpoint resolver is asked, with unknown
    /// services resolved from the default hostname template.
    pub fn client_config(
        &self,
        service: &str,
        overrides: &[Config],
    ) -> Result<ClientConfig, SessionError> {
        let session = self.copy(overrides);
        let config = &session.config;
        let resolved = match config.endpoint() {
            Some(endpoint) => explicit_endpoint(config, endpoint),
            None => {
                let resolver = config.endpoint_resolver().cloned().unwrap_or_default();
                resolver.endpoint_for(
                    service,
                    config.region(),
                    &EndpointOptions {
                        disable_ssl: config.disable_ssl(),
                        use_dual_stack: config.use_dual_stack(),
                        resolve_unknown_service: true,
                    },
                )?
            }
        };
        tracing::debug!(service = %service, endpoint = %resolved.url, "created client config");
        Ok(ClientConfig::new(session, resolved))
    }

    /// Client configuration whose endpoint only ever comes from the config
    ///
    /// The endpoint is empty when the config sets none.
    pub fn client_config_no_resolve_endpoint(&self, overrides: &[Config]) -> ClientConfig {
        let session = self.copy(overrides);
        let resolved = match session.config.endpoint() {
            Some(endpoint) => explicit_endpoint(&session.config, endpoint),
            None => ResolvedEndpoint::default(),
        };
        ClientConfig::new(session, resolved)
    }

    fn init_handlers(&mut self) {
        self.handlers.validate.remove(VALIDATE_PARAMETERS_HANDLER);
        if !self.config.disable_param_validation() {
            self.handlers.validate.push_back(validate_parameters_handler());
        }
    }
}

fn explicit_endpoint(config: &Config, endpoint: &str) -> ResolvedEndpoint {
    ResolvedEndpoint {
        url: add_scheme(endpoint, config.disable_ssl()),
        signing_region: config.region().cloned().map(SigningRegion::from),
        ..Default::default()
    }
}

fn new_session(
    options: &Options,
    env_config: &EnvConfig,
    provider_config: ProviderConfig,
    ca_bundle: Option<Vec<u8>>,
) -> Result<Session, SessionError> {
    let mut config = options.config.clone();

    let http_client = match (ca_bundle, config.http_client()) {
        (Some(_), Some(_)) => {
            return Err(SessionError::LoadCustomCaBundle {
                message: "unable to load custom CA bundle, HTTPClient's transport unsupported type",
                source: None,
            })
        }
        (Some(pem), None) => {
            SharedHttpClient::new(HyperClient::with_ca_bundle(&pem).map_err(|err| {
                SessionError::ca_bundle("failed to load custom CA bundle PEM file", err)
            })?)
        }
        (None, Some(http_client)) => http_client.clone(),
        (None, None) => provider_config.http_client(),
    };
    config.set_http_client(http_client.clone());
    let provider_config = provider_config.with_http_client(http_client);

    let files = match &options.shared_config_files {
        Some(files) => files.clone(),
        None => ProfileFiles::builder()
            .include_default_config_file(env_config.enable_shared_config)
            .include_default_credentials_file(true)
            .build(),
    };
    let shared = shared_config::load(
        &provider_config.fs(),
        &provider_config.env(),
        &env_config.profile,
        &files,
    )?;

    merge_config_sources(&mut config, options, env_config, &shared, &provider_config)?;
    config.set_endpoint_resolver_if_unset(SharedEndpointResolver::default());

    let mut session = Session {
        config,
        handlers: Handlers::defaults(),
    };
    session.init_handlers();
    tracing::debug!(
        profile = %env_config.profile,
        shared_config = env_config.enable_shared_config,
        region = ?session.config.region(),
        "created session"
    );
    Ok(session)
}

fn merge_config_sources(
    config: &mut Config,
    options: &Options,
    env_config: &EnvConfig,
    shared: &SharedConfig,
    provider_config: &ProviderConfig,
) -> Result<(), SessionError> {
    let region = env_config.region.clone().or_else(|| {
        if env_config.enable_shared_config {
            shared.region.clone()
        } else {
            None
        }
    });
    config.set_region_if_unset(region.map(Region::new));

    if config.credentials().is_some() {
        return Ok(());
    }
    let provider = resolve_credentials(config, options, env_config, shared, provider_config)?;
    config.set_credentials(CredentialsCache::from_shared(provider));
    Ok(())
}

fn resolve_credentials(
    config: &Config,
    options: &Options,
    env_config: &EnvConfig,
    shared: &SharedConfig,
    provider_config: &ProviderConfig,
) -> Result<SharedCredentialsProvider, SessionError> {
    if let Some(provider) = ibm_credentials(provider_config, &env_config.profile) {
        return Ok(provider);
    }

    let enabled = env_config.enable_shared_config;
    if let Some(source) = shared.assume_role.credential_source.as_ref().filter(|_| enabled) {
        if shared.assume_role.source_profile.is_some() {
            return Err(SessionError::SharedConfigSourceCollision);
        }
        return match source.as_str() {
            CREDENTIAL_SOURCE_ENVIRONMENT => {
                let keys = env_config.keys.clone().unwrap_or_default();
                Ok(static_provider(&keys, ENV_CONFIG_PROVIDER_NAME))
            }
            _ => Err(SessionError::SharedConfigInvalidCredSource),
        };
    }

    if let Some(keys) = &env_config.keys {
        tracing::debug!(provider = ENV_CONFIG_PROVIDER_NAME, "using access keys");
        return Ok(static_provider(keys, ENV_CONFIG_PROVIDER_NAME));
    }

    if let (true, Some(role_arn), Some(source)) = (
        enabled,
        shared.assume_role.role_arn.as_ref(),
        shared.assume_role_source.as_ref(),
    ) {
        return assume_role_provider(role_arn, source, options, shared, provider_config);
    }

    if let Some(keys) = &shared.keys {
        tracing::debug!(provider = SHARED_CONFIG_PROVIDER_NAME, profile = %shared.profile, "using access keys");
        return Ok(static_provider(keys, SHARED_CONFIG_PROVIDER_NAME));
    }

    tracing::debug!("no credentials found, falling back to a failing chain");
    Ok(SharedCredentialsProvider::new(
        ChainProvider::first_try(
            "Environment",
            DiagnosticProvider::new(
                "EnvAccessKeyNotFound",
                "failed to find credentials in the environment.",
            ),
        )
        .or_else(
            "SharedCredentials",
            DiagnosticProvider::new(
                "SharedCredsLoad",
                format!("failed to load profile, {}.", env_config.profile),
            ),
        )
        .verbose_errors(config.credentials_chain_verbose_errors()),
    ))
}

/// The first valid IBM IAM provider
fn ibm_credentials(
    provider_config: &ProviderConfig,
    profile: &str,
) -> Option<SharedCredentialsProvider> {
    let env = EnvironmentProvider::builder().configure(provider_config).build();
    if env.is_valid() {
        tracing::debug!(provider = ENV_PROVIDER_NAME, "using IAM credentials");
        return Some(SharedCredentialsProvider::new(env));
    }
    let credentials_file = SharedCredentialsFileProvider::builder()
        .configure(provider_config)
        .profile_name(profile)
        .build();
    if credentials_file.is_valid() {
        tracing::debug!(provider = SHARED_CREDENTIALS_PROVIDER_NAME, profile = %profile, "using IAM credentials");
        return Some(SharedCredentialsProvider::new(credentials_file));
    }
    let config_file = SharedConfigFileProvider::builder()
        .configure(provider_config)
        .profile_name(profile)
        .build();
    if config_file.is_valid() {
        tracing::debug!(provider = IBM_SHARED_CONFIG_PROVIDER_NAME, profile = %profile, "using IAM credentials");
        return Some(SharedCredentialsProvider::new(config_file));
    }
    None
}

fn assume_role_provider(
    role_arn: &str,
    source: &StaticKeys,
    options: &Options,
    shared: &SharedConfig,
    provider_config: &ProviderConfig,
) -> Result<SharedCredentialsProvider, SessionError> {
    let assume_role = &shared.assume_role;
    if assume_role.mfa_serial.is_some() && options.assume_role_token_provider.is_none() {
        return Err(SessionError::AssumeRoleTokenProviderNotSet);
    }
    let assumer = options
        .role_assumer
        .clone()
        .ok_or_else(|| SessionError::RoleAssumerNotSet {
            role_arn: role_arn.to_string(),
        })?;
    let mut builder =
        AssumeRoleProvider::builder(role_arn).time_source(provider_config.time_source());
    builder
        .set_role_session_name(assume_role.role_session_name.clone())
        .set_external_id(assume_role.external_id.clone())
        .set_mfa_serial(assume_role.mfa_serial.clone());
    if let Some(mfa) = &options.assume_role_token_provider {
        builder = builder.mfa_token_provider(mfa.clone());
    }
    if let Some(duration) = assume_role.duration {
        builder = builder.duration(duration);
    }
    tracing::debug!(role_arn = %role_arn, profile = %shared.profile, "assuming role");
    Ok(SharedCredentialsProvider::new(builder.build(
        static_provider(source, SHARED_CONFIG_PROVIDER_NAME),
        assumer,
    )))
}

fn static_provider(keys: &StaticKeys, name: &'static str) -> SharedCredentialsProvider {
    SharedCredentialsProvider::new(StaticKeyProvider::named(
        keys.access_key_id.clone(),
        keys.secret_access_key.clone(),
        keys.session_token.clone(),
        name,
    ))
}

#[cfg(test)]
mod test {
    use super::{Options, Session, SharedConfigState};
    use crate::config::Config;
    use crate::handlers::VALIDATE_PARAMETERS_HANDLER;
    use cos_auth::token_manager::{
        ManageToken, SharedTokenManager, SharedTokenManagerFactory, TokenManagerFactory,
        TokenSource,
    };
    use cos_auth::TokenError;
    use cos_auth::CredentialsCache;
    use cos_auth_providers::assume_role::{
        mfa_token_fn, AssumeRole, AssumeRoleRequest, SharedMfaTokenProvider, SharedRoleAssumer,
    };
    use cos_auth_providers::provider_config::ProviderConfig;
    use cos_endpoint::{resolver_fn, ResolvedEndpoint, SharedEndpointResolver};
    use cos_types::os_shim_internal::{Env, Fs};
    use cos_types::profile::{ProfileFileKind, ProfileFiles};
    use cos_types::{Credentials, ProviderType, Region, SigningRegion, SigningService, Token};
    use std::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::UNIX_EPOCH;
    use tracing_test::traced_test;

    const CREDENTIALS: &str = "\
[default]
aws_access_key_id = SHARED_AKID
aws_secret_access_key = SHARED_SECRET

[ibm]
ibm_api_key_id = shared-api-key
ibm_service_instance_id = instance

[source]
aws_access_key_id = SOURCE_AKID
aws_secret_access_key = SOURCE_SECRET
";

    const CONFIG: &str = "\
[default]
region = eu-de

[profile collision]
credential_source = Environment
source_profile = source

[profile from_env]
credential_source = Environment

[profile ec2]
credential_source = Ec2InstanceMetadata

[profile role]
role_arn = crn:v1:role
source_profile = source
role_session_name = session

[profile mfa_role]
role_arn = crn:v1:role
source_profile = source
mfa_serial = serial
";

    /// Hands out token managers whose access token is the API key they were built for
    #[derive(Debug)]
    struct KeyEchoFactory;

    #[derive(Debug)]
    struct KeyEchoManager(String);

    #[async_trait::async_trait]
    impl ManageToken for KeyEchoManager {
        async fn get(&self) -> Result<Token, TokenError> {
            Ok(Token::new(self.0.clone(), "refresh", "Bearer", 3600, UNIX_EPOCH))
        }

        async fn refresh(&self) -> Result<Token, TokenError> {
            self.get().await
        }

        fn is_expired(&self) -> bool {
            false
        }

        fn start_background_refresh(&self) {}

        fn stop_background_refresh(&self) {}
    }

    impl TokenManagerFactory for KeyEchoFactory {
        fn token_manager(&self, source: TokenSource) -> SharedTokenManager {
            let key = match source {
                TokenSource::ApiKey { api_key, .. } => api_key,
                _ => "issuer".to_string(),
            };
            SharedTokenManager::new(KeyEchoManager(key))
        }
    }

    #[derive(Clone, Debug, Default)]
    struct RecordingAssumer {
        requests: Arc<Mutex<Vec<(String, AssumeRoleRequest)>>>,
    }

    #[async_trait::async_trait]
    impl AssumeRole for RecordingAssumer {
        async fn assume_role(
            &self,
            source: Credentials,
            request: AssumeRoleRequest,
        ) -> Result<Credentials, Box<dyn Error + Send + Sync + 'static>> {
            self.requests
                .lock()
                .unwrap()
                .push((source.access_key_id().to_string(), request));
            Ok(Credentials::from_keys("ROLE_AKID", "ROLE_SECRET", Some("ROLE_TOKEN".into()), "test"))
        }
    }

    fn provider_config(env: &[(&str, &str)]) -> ProviderConfig {
        let mut vars = vec![("HOME", "/home")];
        vars.extend_from_slice(env);
        ProviderConfig::default()
            .with_env(Env::from_slice(&vars))
            .with_fs(Fs::from_slice(&[
                ("/home/.aws/credentials", CREDENTIALS),
                ("/home/.aws/config", CONFIG),
            ]))
            .with_token_manager_factory(SharedTokenManagerFactory::new(KeyEchoFactory))
    }

    fn options(env: &[(&str, &str)]) -> Options {
        Options::default().provider_config(provider_config(env))
    }

    async fn credentials(session: &Session) -> Credentials {
        session
            .config()
            .credentials()
            .expect("session always sets credentials")
            .get()
            .await
            .expect("credentials resolve")
    }

    #[tokio::test]
    async fn explicit_credentials_win() {
        let explicit = CredentialsCache::new(Credentials::from_keys("EXPLICIT", "SECRET", None, "Explicit"));
        let session = Session::with_options(
            options(&[("IBM_API_KEY_ID", "env-api-key"), ("AWS_ACCESS_KEY_ID", "A"), ("AWS_SECRET_ACCESS_KEY", "B")])
                .config(Config::builder().credentials(explicit).build()),
        )
        .expect("valid session");
        assert_eq!(credentials(&session).await.access_key_id(), "EXPLICIT");
    }

    #[traced_test]
    #[tokio::test]
    async fn ibm_environment_beats_access_keys() {
        let session = Session::with_options(options(&[
            ("IBM_API_KEY_ID", "env-api-key"),
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "SECRET"),
        ]))
        .expect("valid session");
        let creds = credentials(&session).await;
        assert_eq!(creds.provider_type(), ProviderType::OAuth);
        assert_eq!(creds.provider_name(), "EnvProviderNameIBM");
        assert_eq!(creds.token().map(Token::access_token), Some("env-api-key"));
        assert!(logs_contain("using IAM credentials"));
    }

    #[tokio::test]
    async fn ibm_environment_beats_ibm_shared_credentials() {
        let session = Session::with_options(
            options(&[("IBM_API_KEY_ID", "env-api-key")]).profile("ibm"),
        )
        .expect("valid session");
        let creds = credentials(&session).await;
        assert_eq!(creds.provider_name(), "EnvProviderNameIBM");
        assert_eq!(creds.token().map(Token::access_token), Some("env-api-key"));
        assert_eq!(creds.service_instance_id(), None);
    }

    #[tokio::test]
    async fn ibm_shared_credentials_use_the_session_profile() {
        let session = Session::with_options(options(&[("AWS_PROFILE", "default")]).profile("ibm"))
            .expect("valid session");
        let creds = credentials(&session).await;
        assert_eq!(creds.provider_name(), "SharedCredentialsProviderNameIBM");
        assert_eq!(creds.token().map(Token::access_token), Some("shared-api-key"));
        assert_eq!(creds.service_instance_id(), Some("instance"));
    }

    #[tokio::test]
    async fn environment_keys_beat_shared_keys() {
        let session = Session::with_options(options(&[
            ("AWS_ACCESS_KEY_ID", "ENV_AKID"),
            ("AWS_SECRET_ACCESS_KEY", "ENV_SECRET"),
        ]))
        .expect("valid session");
        let creds = credentials(&session).await;
        assert_eq!(creds.access_key_id(), "ENV_AKID");
        assert_eq!(creds.provider_name(), "EnvConfigCredentials");

        let session = Session::with_options(options(&[])).expect("valid session");
        let creds = credentials(&session).await;
        assert_eq!(creds.access_key_id(), "SHARED_AKID");
        assert_eq!(creds.provider_name(), "SharedConfigCredentials");
    }

    #[tokio::test]
    async fn credential_source_directives() {
        let enabled = |profile: &str, env: &[(&str, &str)]| {
            Session::with_options(
                options(env)
                    .profile(profile)
                    .shared_config_state(SharedConfigState::Enable),
            )
        };

        let err = enabled("collision", &[]).expect_err("both sources set");
        assert_eq!(err.code(), "SharedConfigErr");
        assert_eq!(
            err.to_string(),
            "only source profile or credential source can be specified, not both"
        );

        let err = enabled("ec2", &[]).expect_err("unsupported source");
        assert_eq!(err.code(), "SharedConfigErr");

        let session = enabled(
            "from_env",
            &[("AWS_ACCESS_KEY_ID", "ENV_AKID"), ("AWS_SECRET_ACCESS_KEY", "ENV_SECRET")],
        )
        .expect("environment source");
        assert_eq!(credentials(&session).await.access_key_id(), "ENV_AKID");

        // ignored while shared config is disabled
        let session = Session::with_options(options(&[]).profile("ec2")).expect("valid session");
        let err = session
            .config()
            .credentials()
            .expect("fallback chain")
            .get()
            .await
            .expect_err("no credentials for ec2");
        assert_eq!(err.code(), "NoCredentialProviders");
    }

    #[tokio::test]
    async fn assume_role_from_source_profile() {
        let assumer = RecordingAssumer::default();
        let session = Session::with_options(
            options(&[])
                .profile("role")
                .shared_config_state(SharedConfigState::Enable)
                .role_assumer(SharedRoleAssumer::new(assumer.clone())),
        )
        .expect("valid session");
        let creds = credentials(&session).await;
        assert_eq!(creds.access_key_id(), "ROLE_AKID");
        assert_eq!(creds.provider_name(), "AssumeRoleProvider");
        let requests = assumer.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "SOURCE_AKID");
        assert_eq!(requests[0].1.role_arn, "crn:v1:role");
        assert_eq!(requests[0].1.role_session_name, "session");
    }

    #[tokio::test]
    async fn assume_role_requirements() {
        let enabled = || {
            options(&[]).shared_config_state(SharedConfigState::Enable)
        };
        let err = Session::with_options(
            enabled()
                .profile("mfa_role")
                .role_assumer(SharedRoleAssumer::new(RecordingAssumer::default())),
        )
        .expect_err("mfa without token provider");
        assert_eq!(err.code(), "AssumeRoleTokenProviderNotSetError");
        assert_eq!(
            err.to_string(),
            "assume role with MFA enabled, but AssumeRoleTokenProvider session option not set."
        );

        let err = Session::with_options(enabled().profile("role")).expect_err("no role assumer");
        assert_eq!(err.code(), "RoleAssumerNotSetError");

        let assumer = RecordingAssumer::default();
        let session = Session::with_options(
            enabled()
                .profile("mfa_role")
                .role_assumer(SharedRoleAssumer::new(assumer.clone()))
                .assume_role_token_provider(SharedMfaTokenProvider::new(mfa_token_fn(|| async {
                    Ok("123456".to_string())
                }))),
        )
        .expect("valid session");
        credentials(&session).await;
        let requests = assumer.requests.lock().unwrap();
        assert_eq!(requests[0].1.token_code.as_deref(), Some("123456"));
        assert_eq!(requests[0].1.serial_number.as_deref(), Some("serial"));
    }

    #[tokio::test]
    async fn fallback_chain_explains_what_was_tried() {
        let pc = provider_config(&[]).with_fs(Fs::from_slice(&[]));
        let session = Session::with_options(
            Options::default()
                .provider_config(pc.clone())
                .profile("missing"),
        )
        .expect("valid session");
        let err = session
            .config()
            .credentials()
            .expect("fallback chain")
            .get()
            .await
            .expect_err("nothing configured");
        assert_eq!(err.code(), "NoCredentialProviders");
        assert!(!err.to_string().contains("failed to load profile"));

        let session = Session::with_options(
            Options::default()
                .provider_config(pc)
                .profile("missing")
                .config(Config::builder().credentials_chain_verbose_errors(true).build()),
        )
        .expect("valid session");
        let err = session
            .config()
            .credentials()
            .expect("fallback chain")
            .get()
            .await
            .expect_err("nothing configured");
        let message = err.to_string();
        assert!(message.contains("failed to find credentials in the environment."));
        assert!(message.contains("failed to load profile, missing."));
    }

    #[tokio::test]
    async fn region_precedence() {
        let session = Session::with_options(
            options(&[("AWS_REGION", "us-east")])
                .shared_config_state(SharedConfigState::Enable)
                .config(Config::builder().region(Region::new("us-south")).build()),
        )
        .expect("valid session");
        assert_eq!(session.config().region(), Some(&Region::new("us-south")));

        let session = Session::with_options(
            options(&[("AWS_REGION", "us-east")]).shared_config_state(SharedConfigState::Enable),
        )
        .expect("valid session");
        assert_eq!(session.config().region(), Some(&Region::new("us-east")));

        let session = Session::with_options(options(&[]).shared_config_state(SharedConfigState::Enable))
            .expect("valid session");
        assert_eq!(session.config().region(), Some(&Region::new("eu-de")));

        let session = Session::with_options(options(&[("AWS_SDK_LOAD_CONFIG", "1")]))
            .expect("valid session");
        assert_eq!(session.config().region(), Some(&Region::new("eu-de")));

        let session = Session::with_options(
            options(&[("AWS_SDK_LOAD_CONFIG", "1")]).shared_config_state(SharedConfigState::Disable),
        )
        .expect("valid session");
        assert_eq!(session.config().region(), None);
    }

    #[tokio::test]
    async fn load_config_flag_honors_default_variables() {
        let session = Session::with_options(options(&[
            ("AWS_SDK_LOAD_CONFIG", "1"),
            ("AWS_DEFAULT_REGION", "us-east"),
            ("AWS_DEFAULT_PROFILE", "source"),
        ]))
        .expect("valid session");
        assert_eq!(session.config().region(), Some(&Region::new("us-east")));
        assert_eq!(credentials(&session).await.access_key_id(), "SOURCE_AKID");

        let session = Session::with_options(options(&[
            ("AWS_DEFAULT_REGION", "us-east"),
            ("AWS_DEFAULT_PROFILE", "source"),
        ]))
        .expect("valid session");
        assert_eq!(session.config().region(), None);
        assert_eq!(credentials(&session).await.access_key_id(), "SHARED_AKID");
    }

    #[tokio::test]
    async fn explicit_shared_config_files() {
        let pc = provider_config(&[]).with_fs(Fs::from_slice(&[
            ("/etc/cos/first", "[profile other]\nregion = first\n"),
            ("/etc/cos/second", "[other]\nregion = second\naws_access_key_id = AKID\naws_secret_access_key = SECRET\n"),
        ]));
        let files = ProfileFiles::builder()
            .with_file(ProfileFileKind::Config, "/etc/cos/first")
            .with_file(ProfileFileKind::Credentials, "/etc/cos/second")
            .build();
        let session = Session::with_options(
            Options::default()
                .provider_config(pc)
                .profile("other")
                .shared_config_files(files)
                .shared_config_state(SharedConfigState::Enable),
        )
        .expect("valid session");
        assert_eq!(session.config().region(), Some(&Region::new("second")));
        assert_eq!(credentials(&session).await.access_key_id(), "AKID");
    }

    #[test]
    fn malformed_shared_file_fails_the_session() {
        let pc = provider_config(&[]).with_fs(Fs::from_slice(&[(
            "/home/.aws/credentials",
            "[default\naws_access_key_id = AKID",
        )]));
        let err = Session::with_options(Options::default().provider_config(pc))
            .expect_err("malformed file");
        assert_eq!(err.code(), "SharedConfigLoadError");
    }

    #[test]
    fn custom_ca_bundle_errors() {
        let err = Session::with_options(options(&[("AWS_CA_BUNDLE", "/missing.pem")]))
            .expect_err("bundle file missing");
        assert_eq!(err.code(), "LoadCustomCABundleError");
        assert_eq!(err.to_string(), "failed to open custom CA bundle PEM file");

        let err = Session::with_options(options(&[]).custom_ca_bundle("not a certificate"))
            .expect_err("bundle without certificates");
        assert_eq!(err.code(), "LoadCustomCABundleError");
        assert_eq!(err.to_string(), "failed to load custom CA bundle PEM file");
    }

    #[test]
    fn copy_reinstalls_parameter_validation() {
        let session = Session::with_options(options(&[])).expect("valid session");
        let names = |s: &Session| s.handlers().validate.names().map(str::to_string).collect::<Vec<_>>();
        assert_eq!(names(&session), vec![VALIDATE_PARAMETERS_HANDLER]);

        let copy = session.copy(&[Config::builder().disable_param_validation(true).build()]);
        assert!(copy.handlers().validate.is_empty());
        assert_eq!(names(&session), vec![VALIDATE_PARAMETERS_HANDLER]);

        let back = copy.copy(&[Config::builder().disable_param_validation(false).build()]);
        assert_eq!(names(&back), vec![VALIDATE_PARAMETERS_HANDLER]);
    }

    #[test]
    fn client_config_resolves_endpoints() {
        let session = Session::with_options(
            options(&[]).config(Config::builder().region(Region::new("us-south")).build()),
        )
        .expect("valid session");

        let config = session.client_config("s3", &[]).expect("resolved");
        assert_eq!(config.endpoint, "https://s3.us-south.cloud-object-storage.appdomain.cloud");
        assert_eq!(config.signing_region, Some(SigningRegion::from_static("us-south")));
        assert_eq!(config.signing_name, Some(SigningService::from_static("s3")));
        assert!(config.signing_name_derived);

        let config = session
            .client_config("unmodeled", &[Config::builder().use_dual_stack(true).disable_ssl(true).build()])
            .expect("unknown services resolve");
        assert_eq!(
            config.endpoint,
            "http://unmodeled.dualstack.us-south.cloud-object-storage.appdomain.cloud"
        );

        let config = session
            .client_config("s3", &[Config::builder().endpoint("localhost:9000").disable_ssl(true).build()])
            .expect("explicit endpoint");
        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.signing_region, Some(SigningRegion::from_static("us-south")));
        assert_eq!(config.signing_name, None);

        let session = Session::with_options(options(&[])).expect("valid session");
        let err = session.client_config("s3", &[]).expect_err("no region");
        assert_eq!(err.code(), "MissingRegion");
    }

    #[test]
    fn no_resolve_endpoint_never_calls_the_resolver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let resolver = SharedEndpointResolver::new(resolver_fn(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ResolvedEndpoint::default())
        }));
        let session = Session::with_options(
            options(&[]).config(
                Config::builder()
                    .region(Region::new("us-south"))
                    .endpoint_resolver(resolver)
                    .build(),
            ),
        )
        .expect("valid session");

        let config = session.client_config_no_resolve_endpoint(&[]);
        assert_eq!(config.endpoint, "");
        let config = session.client_config_no_resolve_endpoint(&[Config::builder().endpoint("cos.example.com").build()]);
        assert_eq!(config.endpoint, "https://cos.example.com");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        session.client_config("s3", &[]).expect("resolver called");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn client_config_signs_with_session_credentials() {
        let session = Session::with_options(
            options(&[("IBM_API_KEY_ID", "env-api-key")])
                .config(Config::builder().region(Region::new("us-south")).build()),
        )
        .expect("valid session");
        let config = session.client_config("s3", &[]).expect("resolved");
        let stage = config
            .signing_stage(cos_sig_auth::signer::RequestSigner::new())
            .expect("session credentials");
        let mut request = http::Request::builder()
            .uri(config.endpoint.as_str())
            .body(bytes::Bytes::new())
            .expect("valid request");
        stage
            .sign(
                config.signing_region.as_ref().expect("signing region"),
                config.signing_name.as_ref().expect("signing name"),
                &mut request,
            )
            .await
            .expect("signed");
        assert_eq!(request.headers()[http::header::AUTHORIZATION], "Bearer env-api-key");
    }
}
