//! `brightbox_image`

use super::{LookupSpec, TieBreak, matches, pattern, select_one};
use crate::client::CompositeClient;
use crate::error::Result;
use crate::schema::{computed, optional, optional_computed, resource_schema};
use crate::validate::{Checker, one_of, regex};
use crate::values::{Str, ValueBool, bool_opt, non_empty, str_opt, to_rfc3339, to_str};
use async_trait::async_trait;
use brightbox_api::model::Image;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tf_provider::{AttributeType, Schema, Value, ValueNumber, map};

const ARCHITECTURES: &[&str] = &["x86_64", "i686"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageState {
    pub id: Str,
    pub name: Str,
    pub arch: Str,
    pub official: ValueBool,
    pub public: ValueBool,
    pub compatibility_mode: ValueBool,
    pub most_recent: ValueBool,
    pub owner: Str,
    pub status: Str,
    pub description: Str,
    pub username: Str,
    pub source: Str,
    pub source_type: Str,
    pub virtual_size: ValueNumber,
    pub disk_size: ValueNumber,
    pub min_ram: ValueNumber,
    pub licence_name: Str,
    pub created_at: Str,
}

/// Filters taken from the configuration
struct ImageFilter {
    name: Option<regex::Regex>,
    arch: Option<String>,
    official: Option<bool>,
    public: Option<bool>,
    compatibility_mode: Option<bool>,
    owner: Option<String>,
}

impl ImageFilter {
    fn from_config(config: &ImageState) -> Result<Self> {
        Ok(Self {
            name: pattern("name", &config.name)?,
            arch: str_opt(&config.arch).map(String::from),
            official: bool_opt(&config.official),
            public: bool_opt(&config.public),
            compatibility_mode: bool_opt(&config.compatibility_mode),
            owner: str_opt(&config.owner).map(String::from),
        })
    }

    fn accepts(&self, image: &Image) -> bool {
        image.status == "available"
            && matches(&self.name, &image.name)
            && self.arch.as_ref().is_none_or(|a| *a == image.arch)
            && self.official.is_none_or(|o| o == image.official)
            && self.public.is_none_or(|p| p == image.public)
            && self
                .compatibility_mode
                .is_none_or(|c| c == image.compatibility_mode)
            && self.owner.as_ref().is_none_or(|o| *o == image.owner)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageLookup;

#[async_trait]
impl LookupSpec for ImageLookup {
    type State = ImageState;

    const TYPE_NAME: &'static str = "image";

    fn schema(&self) -> Schema {
        resource_schema(
            "Brightbox Image",
            map! {
                "id" => computed(AttributeType::String, "Identifier of the image"),
                "name" => optional_computed(AttributeType::String, "Regular expression matched against image names"),
                "arch" => optional_computed(AttributeType::String, "x86_64 or i686"),
                "official" => optional_computed(AttributeType::Bool, "Only images provided by Brightbox"),
                "public" => optional_computed(AttributeType::Bool, "Only public images"),
                "compatibility_mode" => optional_computed(AttributeType::Bool, "Only images booting in compatibility mode"),
                "most_recent" => optional(AttributeType::Bool, "Pick the newest of several matches"),
                "owner" => optional_computed(AttributeType::String, "Account owning the image"),
                "status" => computed(AttributeType::String, "Status of the image"),
                "description" => computed(AttributeType::String, "Description of the image"),
                "username" => computed(AttributeType::String, "Default login username"),
                "source" => computed(AttributeType::String, "Source the image was built from"),
                "source_type" => computed(AttributeType::String, "How the image was registered"),
                "virtual_size" => computed(AttributeType::Number, "Virtual size in MiB"),
                "disk_size" => computed(AttributeType::Number, "Size on disk in MiB"),
                "min_ram" => computed(AttributeType::Number, "Minimum RAM in MiB"),
                "licence_name" => computed(AttributeType::String, "Licence of the image"),
                "created_at" => computed(AttributeType::String, "Time the image was registered"),
            },
            HashMap::new(),
        )
    }

    fn validate(&self, checker: &mut Checker<'_>, config: &Self::State) {
        checker.string("name", &config.name, regex);
        checker.string("arch", &config.arch, |v| one_of(v, ARCHITECTURES));
    }

    async fn read(&self, clients: &CompositeClient, config: &Self::State) -> Result<ImageState> {
        let filter = ImageFilter::from_config(config)?;
        let images: Vec<Image> = clients.api.list::<Image>().await?;
        tracing::debug!("Filtering {} images", images.len());
        let candidates = images.into_iter().filter(|i| filter.accepts(i)).collect();
        let image = select_one(
            candidates,
            TieBreak::most_recent(&config.most_recent),
            |i: &Image| i.created_at,
        )?;

        Ok(ImageState {
            id: to_str(&image.id),
            name: to_str(&image.name),
            arch: to_str(&image.arch),
            official: Value::Value(image.official),
            public: Value::Value(image.public),
            compatibility_mode: Value::Value(image.compatibility_mode),
            most_recent: config.most_recent.clone(),
            owner: to_str(&image.owner),
            status: to_str(&image.status),
            description: non_empty(image.description.as_deref()),
            username: non_empty(image.username.as_deref()),
            source: to_str(&image.source),
            source_type: to_str(&image.source_type),
            virtual_size: Value::Value(image.virtual_size),
            disk_size: Value::Value(image.disk_size),
            min_ram: image.min_ram.map_or(Value::Null, Value::Value),
            licence_name: non_empty(image.licence_name.as_deref()),
            created_at: to_rfc3339(image.created_at),
        })
    }
}
