use async_graphql::{
    extensions::apollo_persisted_queries::{ApolloPersistedQueries, LruCacheStorage},
    Context, EmptySubscription, Object, Schema, SimpleObject, Upload,
};

use crate::config::Config;

pub(crate) type DemoSchema = Schema<Query, Mutation, EmptySubscription>;

pub(crate) struct Query;

#[Object]
impl Query {
    /// Greets `name`, or the world when none is given.
    async fn hello(&self, name: Option<String>) -> String {
        format!("Hello, {}!", name.as_deref().unwrap_or("world"))
    }
}

/// What the server received for one uploaded file.
#[derive(SimpleObject)]
pub(crate) struct File {
    filename: String,
    mimetype: Option<String>,
    size: u64,
}

pub(crate) struct Mutation;

#[Object]
impl Mutation {
    async fn single_upload(&self, ctx: &Context<'_>, file: Upload) -> async_graphql::Result<File> {
        describe(ctx, file)
    }

    async fn multiple_upload(&self, ctx: &Context<'_>, files: Vec<Upload>) -> async_graphql::Result<Vec<File>> {
        files.into_iter().map(|file| describe(ctx, file)).collect()
    }
}

fn describe(ctx: &Context<'_>, upload: Upload) -> async_graphql::Result<File> {
    let value = upload.value(ctx)?;
    let size = value.size()?;

    tracing::debug!(filename = %value.filename, size, "received upload");

    Ok(File {
        filename: value.filename,
        mimetype: value.content_type,
        size,
    })
}

pub(crate) fn build(config: &Config) -> DemoSchema {
    let mut builder = Schema::build(Query, Mutation, EmptySubscription);

    if !config.graph.introspection {
        builder = builder.disable_introspection();
    }

    if config.persisted_queries.enabled {
        let storage = LruCacheStorage::new(config.persisted_queries.cache_size);
        builder = builder.extension(ApolloPersistedQueries::new(storage));
    }

    builder.finish()
}
