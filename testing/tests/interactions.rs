use hookwire_core::prelude::*;
use hookwire_core::{METADATA_KEY, MessageMetadata, SequenceMismatch};
use hookwire_runtime::{
    App, AppBuilder, AppOptions, Error as AppError, FlowHandle, InteractionType, RuntimeConfig,
    ViewType,
};
use hookwire_test::fixtures::{self, CHANNEL, RESPONSE_URL, TEAM, USER};
use hookwire_test::{InMemoryMessageIo, IoCall, ledger_kinds};
use serde_json::json;
use std::sync::Arc;

fn counter_app(io: Arc<InMemoryMessageIo>) -> (App, FlowHandle) {
    let mut builder = AppBuilder::new();
    let counter = builder.add_flow(fixtures::counter_flow()).unwrap();
    let handle = counter.clone();
    builder.add_slash("/counter", move |ctx, _cmd| {
        let handle = handle.clone();
        async move { ctx.start_flow(&handle, FlowProps::new()).await }
    });
    (builder.build(io, RuntimeConfig::default()), counter)
}

#[tokio::test]
async fn test_counter_click_updates_message() {
    let io = Arc::new(InMemoryMessageIo::new());
    let (app, _) = counter_app(io.clone());

    let message = app
        .handle_slash_command(fixtures::slash("/counter", ""))
        .await
        .unwrap();
    assert_eq!(message.text.as_deref(), Some("Count: 0"));
    assert_eq!(
        ledger_kinds(app.codec(), message.metadata.as_ref()),
        vec!["state", "callback"]
    );

    let click = fixtures::block_actions("1.000001", message.metadata.clone(), &["hw_counter_cb_1"]);
    app.handle_interaction(click).await.unwrap();

    let updates = io.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].text.as_deref(), Some("Count: 1"));
    assert!(updates[0].replace_original);

    let target = &io.update_targets()[0];
    assert_eq!(target.response_url.as_deref(), Some(RESPONSE_URL));
    assert_eq!(target.message_ts.as_deref(), Some("1.000001"));

    // Clicking the updated message keeps counting from the stored value.
    let metadata = updates[0].metadata.clone();
    let again = fixtures::block_actions("1.000001", metadata, &["hw_counter_cb_1"]);
    app.handle_interaction(again).await.unwrap();
    assert_eq!(io.updates()[1].text.as_deref(), Some("Count: 2"));
}

#[tokio::test]
async fn test_typed_props_reach_the_render() {
    #[derive(serde::Serialize)]
    struct CounterProps {
        step: i64,
    }

    let io = Arc::new(InMemoryMessageIo::new());
    let mut builder = AppBuilder::new();
    let counter = builder.add_flow(fixtures::counter_flow()).unwrap();
    builder.add_slash("/by-five", move |ctx, _cmd| {
        let counter = counter.clone();
        async move { ctx.start_flow_typed(&counter, &CounterProps { step: 5 }).await }
    });
    let app = builder.build(io.clone(), RuntimeConfig::default());

    let message = app
        .handle_slash_command(fixtures::slash("/by-five", ""))
        .await
        .unwrap();
    let click = fixtures::block_actions("1.000001", message.metadata, &["hw_counter_cb_1"]);
    app.handle_interaction(click).await.unwrap();
    assert_eq!(io.updates()[0].text.as_deref(), Some("Count: 5"));
}

#[tokio::test]
async fn test_unknown_callback_aborts_without_update() {
    let io = Arc::new(InMemoryMessageIo::new());
    let (app, _) = counter_app(io.clone());
    let message = app
        .handle_slash_command(fixtures::slash("/counter", ""))
        .await
        .unwrap();

    let forged = fixtures::block_actions("1.000001", message.metadata, &["hw_counter_cb_ff"]);
    let err = app.handle_interaction(forged).await.unwrap_err();

    assert!(err.is_stale_event());
    assert!(matches!(
        err,
        AppError::Core(Error::UnknownCallback(ref id)) if id == "hw_counter_cb_ff"
    ));
    assert!(io.updates().is_empty());
}

#[tokio::test]
async fn test_stored_ledger_shorter_than_render() {
    let io = Arc::new(InMemoryMessageIo::new());
    let (app, _) = counter_app(io.clone());

    let mut metadata = MessageMetadata::new("hookwire");
    metadata.event_payload.insert(
        METADATA_KEY.into(),
        json!({"f": "counter", "h": [{"k": "state", "d": 5}]}),
    );
    let click = fixtures::block_actions("1.000001", Some(metadata), &["hw_counter_cb_1"]);
    let err = app.handle_interaction(click).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Core(Error::HookSequenceMismatch(SequenceMismatch::OutOfRange {
            index: 1,
            stored: 1,
            ..
        }))
    ));
    assert!(io.updates().is_empty());
}

#[tokio::test]
async fn test_missing_metadata_and_unregistered_flow() {
    let io = Arc::new(InMemoryMessageIo::new());
    let (app, _) = counter_app(io.clone());

    let bare = fixtures::block_actions("1.000001", None, &["hw_counter_cb_1"]);
    assert!(matches!(
        app.handle_interaction(bare).await,
        Err(AppError::Core(Error::MissingMetadata))
    ));

    let mut metadata = MessageMetadata::new("hookwire");
    metadata
        .event_payload
        .insert(METADATA_KEY.into(), json!({"f": "retired"}));
    let stale = fixtures::block_actions("1.000001", Some(metadata), &["hw_retired_cb_0"]);
    assert!(matches!(
        app.handle_interaction(stale).await,
        Err(AppError::Core(Error::UnknownFlow(ref name))) if name == "retired"
    ));
}

#[tokio::test]
async fn test_home_tab_round_trip_through_private_field() {
    let io = Arc::new(InMemoryMessageIo::new());
    let (app, counter) = counter_app(io.clone());

    app.update_home(TEAM, USER, |ctx| async move {
        ctx.start_flow(&counter, FlowProps::new()).await
    })
    .await
    .unwrap();

    let (home, private) = io.published().remove(0);
    assert_eq!(home.text.as_deref(), Some("Count: 0"));
    assert!(!private.is_empty());

    let click = fixtures::view_block_actions(ViewType::Home, &private, &["hw_counter_cb_1"]);
    app.handle_interaction(click).await.unwrap();

    let published = io.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[1].0.text.as_deref(), Some("Count: 1"));
    assert!(io.updates().is_empty());
    assert_eq!(
        io.home(TEAM, USER).unwrap().text.as_deref(),
        Some("Count: 1")
    );
}

#[tokio::test]
async fn test_home_requires_a_message() {
    let io = Arc::new(InMemoryMessageIo::new());
    let (app, _) = counter_app(io.clone());

    let err = app
        .update_home(TEAM, USER, |_| async { Ok::<Option<Message>, AppError>(None) })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::HomeRequiresMessage));
    assert!(io.published().is_empty());
}

#[tokio::test]
async fn test_slash_errors_use_the_formatter() {
    let io = Arc::new(InMemoryMessageIo::new());
    let mut builder = AppBuilder::new();
    builder.options(
        AppOptions::default()
            .with_error_formatter(|err| Message::ephemeral_text(format!("oops: {}", err))),
    );
    let app = builder.build(io, RuntimeConfig::default());

    let reply = app
        .handle_slash_command(fixtures::slash("/nope", ""))
        .await
        .unwrap();
    assert_eq!(
        reply.text.as_deref(),
        Some("oops: no handler for slash command /nope")
    );
}

#[tokio::test]
async fn test_unknown_slash_fallback_and_default_formatting() {
    let io = Arc::new(InMemoryMessageIo::new());
    let mut builder = AppBuilder::new();
    builder.handle_unknown_slash(|_ctx, cmd| async move {
        Ok::<_, AppError>(Some(Message::ephemeral_text(format!(
            "unknown {}",
            cmd.command
        ))))
    });
    builder.add_slash("/broken", |_ctx, _cmd| async {
        Err::<Option<Message>, _>(AppError::Handler(anyhow::anyhow!("backend down")))
    });
    let app = builder.build(io, RuntimeConfig::default());

    let reply = app
        .handle_slash_command(fixtures::slash("/what", ""))
        .await
        .unwrap();
    assert_eq!(reply.text.as_deref(), Some("unknown /what"));

    let reply = app
        .handle_slash_command(fixtures::slash("/broken", ""))
        .await
        .unwrap();
    assert_eq!(reply.text.as_deref(), Some("Something went wrong: backend down"));
    assert_eq!(reply.response_type, hookwire_core::ResponseType::Ephemeral);
}

#[tokio::test]
async fn test_shortcuts_and_unsupported_interactions() {
    let io = Arc::new(InMemoryMessageIo::new());
    let hits = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));

    let mut builder = AppBuilder::new();
    let seen = Arc::clone(&hits);
    builder.add_global_shortcut("open_counter", move |ctx, _| {
        let seen = Arc::clone(&seen);
        async move {
            seen.lock().push(format!("global:{}", ctx.source().user_id));
            Ok::<_, AppError>(())
        }
    });
    let seen = Arc::clone(&hits);
    builder.add_message_shortcut("quote", move |ctx, _| {
        let seen = Arc::clone(&seen);
        async move {
            seen.lock().push(format!("message:{}", ctx.channel_id().unwrap_or("-")));
            Ok::<_, AppError>(())
        }
    });
    let app = builder.build(io, RuntimeConfig::default());

    app.handle_interaction(fixtures::shortcut(InteractionType::Shortcut, "open_counter"))
        .await
        .unwrap();
    app.handle_interaction(fixtures::shortcut(InteractionType::MessageAction, "quote"))
        .await
        .unwrap();
    assert_eq!(
        *hits.lock(),
        vec!["global:U0001".to_string(), format!("message:{}", CHANNEL)]
    );

    assert!(matches!(
        app.handle_interaction(fixtures::shortcut(InteractionType::Shortcut, "quote"))
            .await,
        Err(AppError::UnknownShortcut(ref id)) if id == "quote"
    ));
    assert!(matches!(
        app.handle_interaction(fixtures::shortcut(InteractionType::BlockSuggestion, "x"))
            .await,
        Err(AppError::UnsupportedInteraction(ref kind)) if kind == "block_suggestion"
    ));
}

#[tokio::test]
async fn test_modal_open_and_submission() {
    let io = Arc::new(InMemoryMessageIo::new());
    let submitted = Arc::new(parking_lot::Mutex::new(None));

    let mut builder = AppBuilder::new();
    let survey = builder
        .add_flow(Flow::new("survey", |ctx| {
            let (answer, _) = use_state(ctx, String::new())?;
            Ok(View::new().text(format!("answer: {}", answer)).block(Block::input(
                "Your answer",
                Element::PlainTextInput {
                    action_id: "answer".into(),
                    multiline: false,
                    initial_value: None,
                },
            )))
        }))
        .unwrap();
    let open = survey.clone();
    builder.add_global_shortcut("survey", move |ctx, interaction| {
        let open = open.clone();
        async move {
            let message = ctx
                .start_flow(&open, FlowProps::new())
                .await?
                .unwrap_or_default();
            let trigger = interaction.trigger_id.unwrap_or_default();
            assert!(matches!(
                ctx.open_modal(&message, &trigger).await,
                Err(AppError::NotAModal)
            ));
            ctx.open_modal(&message.with_modal(ModalConfig::new("Survey").submit("Send")), &trigger)
                .await
        }
    });
    let slot = Arc::clone(&submitted);
    builder.on_view_submitted(&survey, move |ctx, interaction| {
        let slot = Arc::clone(&slot);
        async move {
            *slot.lock() = Some((ctx.channel_id().map(str::to_string), interaction.view));
            Ok::<_, AppError>(())
        }
    });
    let app = builder.build(io.clone(), RuntimeConfig::default());

    app.handle_interaction(fixtures::shortcut(InteractionType::Shortcut, "survey"))
        .await
        .unwrap();
    let (trigger, modal, private) = io.opened_views().remove(0);
    assert_eq!(trigger, "trigger-2");
    assert_eq!(modal.modal.unwrap().title, "Survey");

    app.handle_interaction(fixtures::view_submission(&private, json!({"values": {}})))
        .await
        .unwrap();
    let (channel, view) = submitted.lock().take().unwrap();
    assert_eq!(channel.as_deref(), Some(CHANNEL));
    assert_eq!(view.unwrap().state, Some(json!({"values": {}})));

    let other = app
        .codec()
        .to_private_field(
            &app.codec()
                .encode(
                    None,
                    &hookwire_core::Envelope::new("counter", Default::default(), FlowProps::new()),
                    &Default::default(),
                )
                .unwrap(),
        )
        .unwrap();
    assert!(matches!(
        app.handle_interaction(fixtures::view_submission(&other, json!({})))
            .await,
        Err(AppError::UnknownViewSubmission(ref flow)) if flow == "counter"
    ));
    assert!(
        io.calls()
            .iter()
            .all(|call| !matches!(call, IoCall::Update { .. }))
    );
}
