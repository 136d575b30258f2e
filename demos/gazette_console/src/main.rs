use crate::tracing_setup::tracing_init;
use chrono::{TimeZone, Utc};
use clap::Parser;
use futures_signals::signal::SignalExt;
use gazette::api::{ArticleApi, HttpArticleApi};
use gazette::articles::select_articles_for_publication;
use gazette::config::GazetteConfig;
use gazette::drafts::{DraftPatch, DraftUpdater, NEW_ARTICLE_ID};
use gazette::identity::{CognitoIdentity, IdentityProvider};
use gazette::mock::{MockArticleApi, MockIdentity};
use gazette::models::{Author, FullArticle, PaginatedPage, Publication, ShortArticle};
use gazette::navigation::Route;
use gazette::session_storage::{FileSessionStorage, MemorySessionStorage, SessionStorage};
use gazette::{AppState, GazetteApp};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod tracing_setup;

#[derive(Parser, Debug)]
#[command(version, about = "Console front end for the gazette state layer")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use in-memory collaborators instead of the real API and identity provider
    #[arg(long)]
    offline: bool,

    /// Publication to open; the first one is picked when omitted
    #[arg(short, long, default_value = "")]
    publication: String,

    #[arg(short, long)]
    username: Option<String>,

    #[arg(long, env = "GAZETTE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

type Collaborators = (
    Arc<dyn ArticleApi>,
    Arc<dyn IdentityProvider>,
    Arc<dyn SessionStorage>,
);

fn summary(id: &str, publication_id: &str, title: &str, day: u32) -> ShortArticle {
    ShortArticle {
        id: id.to_string(),
        publication_id: publication_id.to_string(),
        title: title.to_string(),
        authors: vec![Author::new("Grace Hopper", "grace@example.com")],
        publish_date: Utc.with_ymd_and_hms(2024, 5, day, 8, 30, 0).single(),
        header_image: None,
    }
}

fn offline_collaborators() -> Collaborators {
    let api = MockArticleApi::new().with_delay(Duration::from_millis(150));
    api.add_publication_page(
        "",
        PaginatedPage::last(vec![
            Publication {
                id: "weekly".to_string(),
                name: "The Weekly".to_string(),
            },
            Publication {
                id: "almanac".to_string(),
                name: "Almanac".to_string(),
            },
        ]),
    );
    for publication_id in ["weekly", "almanac"] {
        api.add_article_page(
            publication_id,
            "",
            PaginatedPage::new(
                vec![
                    summary("a1", publication_id, "Compilers for everyone", 3),
                    summary("a2", publication_id, "A short history of the bug", 1),
                ],
                "more",
            ),
        );
        api.add_article_page(
            publication_id,
            "more",
            PaginatedPage::last(vec![summary("a3", publication_id, "Nanoseconds", 2)]),
        );
    }
    api.add_article(FullArticle {
        summary: summary("a1", "almanac", "Compilers for everyone", 3),
        content: "Once upon a time...".to_string(),
        edit_date: None,
    });

    let identity = MockIdentity::new();
    identity.add_user("grace", "cobol");
    (
        Arc::new(api),
        Arc::new(identity),
        Arc::new(MemorySessionStorage::default()),
    )
}

fn online_collaborators(config: &GazetteConfig) -> Result<Collaborators, gazette::GazetteError> {
    let api = HttpArticleApi::from_config(config)?;
    Ok((
        Arc::new(api),
        Arc::new(
            CognitoIdentity::new(&config.identity).with_token_file(config.session.token_path.clone()),
        ),
        Arc::new(FileSessionStorage::new(config.session.flag_path.clone())),
    ))
}

fn render(state: &AppState) -> String {
    let location = match state.navigation.location() {
        Route::Home => "home".to_string(),
        Route::SignIn => "sign in".to_string(),
        Route::Publication { publication_id } => format!("publication {publication_id}"),
        Route::NewArticle { publication_id } => format!("new article in {publication_id}"),
        Route::EditArticle { article_id, .. } => format!("editing {article_id}"),
    };
    let user = if state.auth.username.is_empty() {
        "signed out"
    } else {
        state.auth.username.as_str()
    };
    let articles = match state.navigation.location() {
        Route::Publication { publication_id } => {
            select_articles_for_publication(&state.articles, publication_id)
                .iter()
                .map(|article| article.title().to_string())
                .collect::<Vec<_>>()
                .join(" | ")
        }
        _ => String::new(),
    };
    let toasts = state
        .toasts
        .toasts
        .iter()
        .map(|toast| toast.text.clone())
        .collect::<Vec<_>>()
        .join(" | ");
    format!("[{location}] [{user}] articles: {articles} toasts: {toasts}")
}

/// Walks through the main flows once publications have loaded.
async fn tour(app: &GazetteApp, args: &Args) -> Result<(), gazette::StoreError> {
    let state = app
        .store()
        .wait_for(|state| matches!(state.navigation.location(), Route::Publication { .. }) || !args.publication.is_empty())
        .await?;
    let publication_id = match state.navigation.location() {
        Route::Publication { publication_id } => publication_id.clone(),
        _ => args.publication.clone(),
    };
    app.refresh_articles(publication_id.as_str())?;
    app.store()
        .wait_for(|state| !select_articles_for_publication(&state.articles, &publication_id).is_empty())
        .await?;
    app.load_next_page(publication_id.as_str())?;

    if let (Some(username), Some(password)) = (&args.username, &args.password) {
        app.sign_in(username.as_str(), password.as_str())?;
        app.store().wait_for(|state| !state.auth.token.is_empty()).await?;

        app.load_draft(publication_id.as_str(), NEW_ARTICLE_ID)?;
        app.update_draft(
            NEW_ARTICLE_ID,
            DraftUpdater::patch(DraftPatch::default().title("Written from the console")),
        )?;
        app.submit_draft(publication_id.as_str(), NEW_ARTICLE_ID)?;
        app.delete_article(publication_id.as_str(), "a2")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_init();
    let mut args = Args::parse();

    let config = match &args.config {
        Some(path) => match GazetteConfig::load(path) {
            Ok(config) => config,
            Err(error) => {
                error!(%error, "could not load configuration");
                return;
            }
        },
        None => GazetteConfig::default(),
    }
    .with_env_overrides();

    let collaborators = if args.offline {
        if args.username.is_none() {
            args.username = Some("grace".to_string());
            args.password = Some("cobol".to_string());
        }
        offline_collaborators()
    } else {
        match online_collaborators(&config) {
            Ok(collaborators) => collaborators,
            Err(error) => {
                error!(%error, "could not set up collaborators");
                return;
            }
        }
    };
    let (api, identity, session) = collaborators;

    let mut app = GazetteApp::start(config, api, identity, session);
    let render_loop = tokio::spawn(
        app.store()
            .to_signal()
            .map(|state| render(&state))
            .dedupe_cloned()
            .for_each(|line| {
                info!("{line}");
                async {}
            }),
    );

    if let Err(error) = app
        .load_auth_info()
        .and_then(|_| app.select_publication(args.publication.as_str()))
    {
        error!(%error, "could not start");
        return;
    }

    tokio::select! {
        result = tour(&app, &args) => {
            if let Err(error) = result {
                error!(%error, "tour stopped");
            }
            info!("tour finished, press ctrl-c to quit");
            let _ = tokio::signal::ctrl_c().await;
        }
        _ = tokio::signal::ctrl_c() => {}
    }

    app.shutdown();
    render_loop.abort();
    info!("bye");
}
