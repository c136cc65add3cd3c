//! Typed bindings of one Instana collection
//!
//! Collections differ only in which HTTP verbs create and update objects;
//! [`Flavor`] captures those differences so every resource shares the same
//! CRUD surface.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::marker::PhantomData;
use tfplug::Context;

use super::client::{resource_path, Client};
use super::error::ApiError;

/// An object stored in an Instana collection
pub trait RestObject: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Platform assigned identifier
    fn id(&self) -> &str;

    /// Identifier used in item URLs
    fn id_for_resource_path(&self) -> &str {
        self.id()
    }

    /// Value of the `name` query parameter for collections that take the
    /// name out of band
    fn query_name(&self) -> Option<&str> {
        None
    }
}

/// How a collection creates and updates objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// create `PUT path/id`, update `PUT path/id`
    PutPut,
    /// create `POST path`, update `PUT path/id`
    PostPut,
    /// create `POST path`, update `POST path/id`
    PostPost,
    /// create `POST path`; objects are immutable
    PostNoUpdate,
    /// create `POST path?name=`, update `PUT path/id?name=`
    NameQuery,
    /// lookups only
    ReadOnly,
}

/// Lists come back either bare or wrapped in an `items` envelope
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Plain(Vec<T>),
    Envelope { items: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Plain(items) | ListBody::Envelope { items } => items,
        }
    }
}

pub struct RestResource<T> {
    client: Client,
    path: &'static str,
    flavor: Flavor,
    _object: PhantomData<fn() -> T>,
}

impl<T> Clone for RestResource<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            path: self.path,
            flavor: self.flavor,
            _object: PhantomData,
        }
    }
}

impl<T: RestObject> RestResource<T> {
    pub fn new(client: Client, path: &'static str, flavor: Flavor) -> Self {
        Self {
            client,
            path,
            flavor,
            _object: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        self.path
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub async fn get_all(&self, ctx: &Context) -> Result<Vec<T>, ApiError> {
        let body: ListBody<T> = self.client.get(ctx, self.path, &[]).await?;
        Ok(body.into_vec())
    }

    pub async fn get_one(&self, ctx: &Context, id: &str) -> Result<T, ApiError> {
        self.client
            .get(ctx, &resource_path(self.path, id), &[])
            .await
    }

    /// Server side filtered listing
    pub async fn get_by_query(
        &self,
        ctx: &Context,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ApiError> {
        let body: ListBody<T> = self.client.get(ctx, self.path, query).await?;
        Ok(body.into_vec())
    }

    pub async fn create(&self, ctx: &Context, object: &T) -> Result<T, ApiError> {
        let item = resource_path(self.path, object.id_for_resource_path());
        let returned = match self.flavor {
            Flavor::PutPut => self.client.put(ctx, &item, &[], object).await?,
            Flavor::PostPut | Flavor::PostPost | Flavor::PostNoUpdate => {
                self.client.post(ctx, self.path, &[], object).await?
            }
            Flavor::NameQuery => {
                let name = object.query_name().unwrap_or_default();
                self.client
                    .post(ctx, self.path, &[("name", name)], object)
                    .await?
            }
            Flavor::ReadOnly => return Err(self.read_only()),
        };
        Ok(returned.unwrap_or_else(|| object.clone()))
    }

    pub async fn update(&self, ctx: &Context, object: &T) -> Result<T, ApiError> {
        let item = resource_path(self.path, object.id_for_resource_path());
        let returned = match self.flavor {
            Flavor::PutPut | Flavor::PostPut => self.client.put(ctx, &item, &[], object).await?,
            Flavor::PostPost => self.client.post(ctx, &item, &[], object).await?,
            Flavor::NameQuery => {
                let name = object.query_name().unwrap_or_default();
                self.client.put(ctx, &item, &[("name", name)], object).await?
            }
            Flavor::PostNoUpdate | Flavor::ReadOnly => return Err(self.read_only()),
        };
        Ok(returned.unwrap_or_else(|| object.clone()))
    }

    pub async fn delete(&self, ctx: &Context, object: &T) -> Result<(), ApiError> {
        self.delete_by_id(ctx, object.id_for_resource_path()).await
    }

    pub async fn delete_by_id(&self, ctx: &Context, id: &str) -> Result<(), ApiError> {
        if self.flavor == Flavor::ReadOnly {
            return Err(self.read_only());
        }
        self.client.delete(ctx, &resource_path(self.path, id)).await
    }

    fn read_only(&self) -> ApiError {
        ApiError::UpdateNotSupported(self.path.to_string())
    }
}
