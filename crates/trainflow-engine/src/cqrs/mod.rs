pub use mediator::DefaultAsyncMediator;

use crate::services::Engine;

pub type AppMediator = DefaultAsyncMediator;

pub fn build_mediator(engine: Engine) -> AppMediator {
    DefaultAsyncMediator::builder()
        // Flow versions
        .add_handler({
            let engine = engine.clone();
            move |cmd| {
                let engine = engine.clone();
                async move { crate::features::flow_versions::commands::create::handle(engine, cmd).await }
            }
        })
        .add_handler({
            let engine = engine.clone();
            move |cmd| {
                let engine = engine.clone();
                async move { crate::features::flow_versions::commands::update::handle(engine, cmd).await }
            }
        })
        .add_handler({
            let engine = engine.clone();
            move |cmd| {
                let engine = engine.clone();
                async move {
                    crate::features::flow_versions::commands::edit_content::handle(engine, cmd).await
                }
            }
        })
        .add_handler({
            let engine = engine.clone();
            move |cmd| {
                let engine = engine.clone();
                async move { crate::features::flow_versions::commands::activate::handle(engine, cmd).await }
            }
        })
        .add_handler({
            let engine = engine.clone();
            move |query| {
                let engine = engine.clone();
                async move { crate::features::flow_versions::queries::get_active::handle(engine, query).await }
            }
        })
        .add_handler({
            let engine = engine.clone();
            move |query| {
                let engine = engine.clone();
                async move { crate::features::flow_versions::queries::get_version::handle(engine, query).await }
            }
        })
        .add_handler({
            let engine = engine.clone();
            move |query| {
                let engine = engine.clone();
                async move {
                    crate::features::flow_versions::queries::list_versions::handle(engine, query).await
                }
            }
        })
        // Assignments
        .add_handler({
            let engine = engine.clone();
            move |cmd| {
                let engine = engine.clone();
                async move { crate::features::assignments::commands::assign::handle(engine, cmd).await }
            }
        })
        .add_handler({
            let engine = engine.clone();
            move |cmd| {
                let engine = engine.clone();
                async move {
                    crate::features::assignments::commands::update_status::handle(engine, cmd).await
                }
            }
        })
        .add_handler({
            let engine = engine.clone();
            move |query| {
                let engine = engine.clone();
                async move {
                    crate::features::assignments::queries::resolve_content::handle(engine, query).await
                }
            }
        })
        .add_handler({
            let engine = engine.clone();
            move |query| {
                let engine = engine.clone();
                async move {
                    crate::features::assignments::queries::list_for_flow::handle(engine, query).await
                }
            }
        })
        // Ranks
        .add_handler(move |query| async move {
            crate::features::ranks::queries::resolve_between::handle(query).await
        })
        .add_handler(move |query| async move {
            crate::features::ranks::queries::spaced::handle(query).await
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VersioningConfig;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mediator_builds() {
        let _mediator = build_mediator(Engine::in_memory(&VersioningConfig::default()));
    }
}
