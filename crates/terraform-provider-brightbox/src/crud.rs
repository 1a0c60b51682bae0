//! Generic resource lifecycle
//!
//! [`ManagedResource`] describes one Brightbox object type: its schema, how
//! to create, fetch, update and delete it, and how to copy an API object
//! into Terraform state. [`Crud`] turns any such description into a
//! `tf_provider::Resource`, adding the shared behaviour: 404 handling,
//! status waits, resource locking and error reporting.

use crate::client::{ClientSlot, CompositeClient};
use crate::diag;
use crate::error::{ProviderError, Result};
use crate::timeouts::{Timeouts, TimeoutsValue};
use crate::validate::Checker;
use crate::values::{Str, str_opt, to_str};
use crate::waiter::{WaitConfig, wait_for_status};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tf_provider::{AttributePath, Diagnostics, Resource, Schema, Value, ValueEmpty};

/// Terraform state shape of a resource
pub trait ResourceState:
    Serialize + DeserializeOwned + Clone + Default + Debug + PartialEq + Send + Sync + 'static
{
    fn id(&self) -> &Str;
    fn id_mut(&mut self) -> &mut Str;

    /// The `timeouts` block, for resources that wait on status changes
    fn timeouts(&self) -> Option<&TimeoutsValue> {
        None
    }

    /// The `locked` attribute, for lockable resources
    fn locked(&self) -> Option<bool> {
        None
    }
}

/// The id of an object already in state
pub fn state_id(state: &impl ResourceState) -> Result<&str> {
    str_opt(state.id()).ok_or_else(|| ProviderError::invalid_config("id", "no id in state"))
}

#[async_trait]
pub trait ManagedResource: Send + Sync + 'static {
    type State: ResourceState;
    type Object: Send + Sync;

    /// Name used in log lines and diagnostics, e.g. "server"
    const TYPE_NAME: &'static str;

    fn schema(&self) -> Schema;

    fn validate(&self, _checker: &mut Checker<'_>, _config: &Self::State) {}

    /// Adjust a proposed state. `prior` is `None` when the object is about to
    /// be created; computed attributes that will only be known after apply
    /// must be marked unknown here.
    fn plan(&self, _planned: &mut Self::State, _prior: Option<&Self::State>) {}

    /// Attributes whose change requires a new object
    fn requires_replace(&self, _prior: &Self::State, _planned: &Self::State) -> Vec<AttributePath> {
        Vec::new()
    }

    async fn create(&self, clients: &CompositeClient, planned: &Self::State) -> Result<Self::Object>;

    /// Steps that need the object to exist and be ready, such as attaching it.
    /// `state` reflects the new object, `planned` what was asked for.
    async fn after_create(
        &self,
        _clients: &CompositeClient,
        _state: &Self::State,
        _planned: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(())
    }

    async fn fetch(&self, clients: &CompositeClient, state: &Self::State) -> Result<Self::Object>;

    async fn update(
        &self,
        _clients: &CompositeClient,
        _prior: &Self::State,
        _planned: &Self::State,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(())
    }

    async fn delete(
        &self,
        clients: &CompositeClient,
        state: &Self::State,
        timeout: Duration,
    ) -> Result<()>;

    async fn set_lock(
        &self,
        _clients: &CompositeClient,
        _state: &Self::State,
        _locked: bool,
    ) -> Result<()> {
        Ok(())
    }

    fn object_id(object: &Self::Object) -> String;

    fn status(_object: &Self::Object) -> &str {
        ""
    }

    /// Objects that still answer a GET but no longer exist for Terraform
    fn is_gone(object: &Self::Object) -> bool {
        Self::status(object) == "deleted"
    }

    fn set_attributes(&self, object: &Self::Object, state: &mut Self::State);

    fn create_wait(&self) -> Option<WaitConfig> {
        None
    }

    fn delete_wait(&self) -> Option<WaitConfig> {
        None
    }

    /// State to read after `terraform import`
    fn import_state(&self, id: &str) -> Result<Self::State> {
        let mut state = <Self::State as Default>::default();
        *state.id_mut() = to_str(id);
        Ok(state)
    }
}

/// Poll an object until `wait` is satisfied
pub async fn wait_for<R: ManagedResource>(
    resource: &R,
    clients: &CompositeClient,
    state: &R::State,
    wait: &WaitConfig,
) -> Result<String> {
    wait_for_status(wait, move || async move {
        let object = resource.fetch(clients, state).await?;
        Ok(if R::is_gone(&object) {
            "deleted".to_string()
        } else {
            R::status(&object).to_string()
        })
    })
    .await
}

/// Adapter from a [`ManagedResource`] to a Terraform resource
pub struct Crud<R> {
    resource: R,
    clients: ClientSlot,
}

impl<R: ManagedResource> Crud<R> {
    pub fn new(resource: R, clients: ClientSlot) -> Self {
        Self { resource, clients }
    }

    fn clients(&self, diags: &mut Diagnostics) -> Option<Arc<CompositeClient>> {
        match self.clients.get() {
            Ok(clients) => Some(clients),
            Err(e) => {
                diag::report(diags, format!("Managing {}", R::TYPE_NAME), &e);
                None
            }
        }
    }

    fn timeouts(state: &R::State) -> Timeouts {
        state.timeouts().map(Timeouts::from_value).unwrap_or_default()
    }

    async fn finish_create(
        &self,
        clients: &CompositeClient,
        state: &mut R::State,
        planned: &R::State,
        timeout: Duration,
    ) -> Result<()> {
        if let Some(wait) = self.resource.create_wait() {
            wait_for(&self.resource, clients, state, &wait.with_timeout(timeout)).await?;
        }
        self.resource
            .after_create(clients, state, planned, timeout)
            .await?;
        if planned.locked() == Some(true) {
            self.resource.set_lock(clients, state, true).await?;
        }
        let object = self.resource.fetch(clients, state).await?;
        self.resource.set_attributes(&object, state);
        Ok(())
    }

    async fn apply_update(
        &self,
        clients: &CompositeClient,
        prior: &R::State,
        planned: &R::State,
        timeout: Duration,
    ) -> Result<()> {
        let lock = planned.locked().filter(|l| Some(*l) != prior.locked());
        if lock == Some(false) {
            self.resource.set_lock(clients, prior, false).await?;
        }
        self.resource.update(clients, prior, planned, timeout).await?;
        if lock == Some(true) {
            self.resource.set_lock(clients, prior, true).await?;
        }
        Ok(())
    }

    async fn apply_delete(&self, clients: &CompositeClient, state: &R::State) -> Result<()> {
        let timeout = Self::timeouts(state).delete;
        match self.resource.delete(clients, state, timeout).await {
            Err(e) if e.is_not_found() => {
                tracing::info!("{} {} was already deleted", R::TYPE_NAME, state_id(state)?);
                return Ok(());
            }
            other => other?,
        }
        if let Some(wait) = self.resource.delete_wait() {
            wait_for(&self.resource, clients, state, &wait.with_timeout(timeout)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<R: ManagedResource> Resource for Crud<R> {
    type State<'a> = Value<R::State>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(self.resource.schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        if let Value::Value(config) = &config {
            let mut checker = Checker::new(diags);
            self.resource.validate(&mut checker, config);
            if let Some(timeouts) = config.timeouts() {
                for problem in Timeouts::invalid(timeouts) {
                    checker.fail("timeouts", problem.to_string());
                }
            }
        }

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Value::Value(mut state) = state else {
            return Some((Value::Null, private_state));
        };
        let Some(id) = str_opt(state.id()).map(String::from) else {
            return Some((Value::Null, private_state));
        };
        let clients = self.clients(diags)?;

        match self.resource.fetch(&clients, &state).await {
            Ok(object) if R::is_gone(&object) => {
                tracing::warn!("{} {} is gone, removing it from state", R::TYPE_NAME, id);
                Some((Value::Null, private_state))
            }
            Ok(object) => {
                self.resource.set_attributes(&object, &mut state);
                Some((Value::Value(state), private_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("{} {} not found, removing it from state", R::TYPE_NAME, id);
                Some((Value::Null, private_state))
            }
            Err(e) => {
                diag::report(diags, format!("Reading {} {}", R::TYPE_NAME, id), &e);
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Value::Value(mut planned) = proposed_state else {
            return Some((Value::Null, Default::default()));
        };
        *planned.id_mut() = Value::Unknown;
        self.resource.plan(&mut planned, None);
        Some((Value::Value(planned), Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let (Value::Value(prior), Value::Value(mut planned)) = (prior_state, proposed_state) else {
            diags.root_error(
                format!("Planning {}", R::TYPE_NAME),
                "prior or proposed state is missing".to_string(),
            );
            return None;
        };
        self.resource.plan(&mut planned, Some(&prior));
        let replace = self.resource.requires_replace(&prior, &planned);
        if !replace.is_empty() {
            tracing::debug!("{} changes require replacement", R::TYPE_NAME);
        }
        Some((Value::Value(planned), prior_private_state, replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        _prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        Some(())
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Value::Value(mut state) = planned_state else {
            diags.root_error(
                format!("Creating {}", R::TYPE_NAME),
                "planned state is missing".to_string(),
            );
            return None;
        };
        let clients = self.clients(diags)?;
        let timeout = Self::timeouts(&state).create;

        let object = match self.resource.create(&clients, &state).await {
            Ok(object) => object,
            Err(e) => {
                diag::report(diags, format!("Creating {}", R::TYPE_NAME), &e);
                return None;
            }
        };
        let id = R::object_id(&object);
        tracing::info!("Created {} {}", R::TYPE_NAME, id);

        *state.id_mut() = to_str(&id);
        let planned = state.clone();
        self.resource.set_attributes(&object, &mut state);

        // The object exists from here on, so failures still return its state
        if let Err(e) = self
            .finish_create(&clients, &mut state, &planned, timeout)
            .await
        {
            diag::report(diags, format!("Creating {} {}", R::TYPE_NAME, id), &e);
        }
        Some((Value::Value(state), private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let (Value::Value(prior), Value::Value(mut state)) = (prior_state, planned_state) else {
            diags.root_error(
                format!("Updating {}", R::TYPE_NAME),
                "prior or planned state is missing".to_string(),
            );
            return None;
        };
        let clients = self.clients(diags)?;
        let id = str_opt(prior.id()).unwrap_or_default().to_string();
        let timeout = Self::timeouts(&state).update;

        if let Err(e) = self.apply_update(&clients, &prior, &state, timeout).await {
            diag::report(diags, format!("Updating {} {}", R::TYPE_NAME, id), &e);
            return Some((Value::Value(prior), private_state));
        }
        tracing::info!("Updated {} {}", R::TYPE_NAME, id);

        *state.id_mut() = prior.id().clone();
        match self.resource.fetch(&clients, &state).await {
            Ok(object) => self.resource.set_attributes(&object, &mut state),
            Err(e) => diag::report(diags, format!("Reading {} {}", R::TYPE_NAME, id), &e),
        }
        Some((Value::Value(state), private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let Value::Value(state) = state else {
            return Some(());
        };
        let clients = self.clients(diags)?;
        let id = str_opt(state.id()).unwrap_or_default().to_string();

        match self.apply_delete(&clients, &state).await {
            Ok(()) => {
                tracing::info!("Deleted {} {}", R::TYPE_NAME, id);
                Some(())
            }
            Err(e) => {
                diag::report(diags, format!("Deleting {} {}", R::TYPE_NAME, id), &e);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let clients = self.clients(diags)?;
        let imported = async {
            let mut state = self.resource.import_state(&id)?;
            let object = self.resource.fetch(&clients, &state).await?;
            self.resource.set_attributes(&object, &mut state);
            Ok::<_, ProviderError>(state)
        }
        .await;

        match imported {
            Ok(state) => Some((Value::Value(state), Default::default())),
            Err(e) => {
                diag::report(diags, format!("Importing {} {}", R::TYPE_NAME, id), &e);
                None
            }
        }
    }
}
