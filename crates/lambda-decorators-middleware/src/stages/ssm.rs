//! AWS Systems Manager Parameter Store backend.
//!
//! Enabled with the `ssm` feature. The store owns a single-threaded tokio
//! runtime and blocks on SDK calls, matching the synchronous handler
//! contract. It must therefore not be used from inside another async
//! runtime; doing so fails with [`StoreError::Unreachable`].

use super::parameters::ParameterStore;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::Client as SsmClient;
use lambda_decorators_core::StoreError;
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};

/// Maximum number of names accepted by one `GetParameters` call.
const BATCH_SIZE: usize = 10;

/// Parameter store backed by AWS SSM.
///
/// ```no_run
/// use lambda_decorators_middleware::stages::{ParameterStoreDecorator, SsmParameterStore};
///
/// let store = SsmParameterStore::from_env().unwrap();
/// let params = ParameterStoreDecorator::new(store, ["/prod/db_url", "/prod/api_key"]);
/// ```
#[derive(Debug)]
pub struct SsmParameterStore {
    client: SsmClient,
    runtime: Runtime,
    with_decryption: bool,
}

impl SsmParameterStore {
    /// Creates a store using credentials and region from the environment.
    pub fn from_env() -> Result<Self, StoreError> {
        let runtime = build_runtime()?;
        let config = runtime.block_on(aws_config::load_from_env());
        Ok(Self {
            client: SsmClient::new(&config),
            runtime,
            with_decryption: true,
        })
    }

    /// Creates a store around an existing client.
    pub fn with_client(client: SsmClient) -> Result<Self, StoreError> {
        Ok(Self {
            client,
            runtime: build_runtime()?,
            with_decryption: true,
        })
    }

    /// Enables or disables decryption of `SecureString` parameters.
    #[must_use]
    pub fn decrypt(mut self, with_decryption: bool) -> Self {
        self.with_decryption = with_decryption;
        self
    }

    fn block_on<F: Future>(&self, future: F) -> Result<F::Output, StoreError> {
        if Handle::try_current().is_ok() {
            return Err(StoreError::unreachable(
                "SSM parameter store cannot block inside an async runtime",
            ));
        }
        Ok(self.runtime.block_on(future))
    }
}

fn build_runtime() -> Result<Runtime, StoreError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| StoreError::unreachable(format!("failed to start runtime: {e}")))
}

impl ParameterStore for SsmParameterStore {
    fn get(&self, name: &str) -> Result<String, StoreError> {
        let request = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(self.with_decryption)
            .send();

        let output = self.block_on(request)?.map_err(|err| {
            match err.as_service_error() {
                Some(service) if service.is_parameter_not_found() => StoreError::not_found(name),
                _ => StoreError::unreachable(DisplayErrorContext(&err).to_string()),
            }
        })?;

        output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_string)
            .ok_or_else(|| StoreError::not_found(name))
    }

    fn get_many(&self, names: &[String]) -> Result<Vec<(String, String)>, StoreError> {
        let mut values = Vec::with_capacity(names.len());

        for batch in names.chunks(BATCH_SIZE) {
            let request = self
                .client
                .get_parameters()
                .set_names(Some(batch.to_vec()))
                .with_decryption(self.with_decryption)
                .send();

            let output = self
                .block_on(request)?
                .map_err(|err| StoreError::unreachable(DisplayErrorContext(&err).to_string()))?;

            if let Some(missing) = output.invalid_parameters().first() {
                return Err(StoreError::not_found(missing.clone()));
            }

            for parameter in output.parameters() {
                if let (Some(name), Some(value)) = (parameter.name(), parameter.value()) {
                    values.push((name.to_string(), value.to_string()));
                }
            }
        }

        if let Some(missing) = names
            .iter()
            .find(|name| !values.iter().any(|(fetched, _)| fetched == *name))
        {
            return Err(StoreError::not_found(missing.clone()));
        }

        Ok(values)
    }
}
