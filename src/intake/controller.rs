//! FormController — interprets commands, button presses and text against
//! the user's intake session.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::channels::{Channel, EventKind, IncomingEvent, MessageTarget, UserId};

use super::action::FormAction;
use super::archive::ProfileArchive;
use super::i18n::{Language, Localized, Msg, fill, text};
use super::model::{FinishedProfile, Medications};
use super::parse::parse_age_sex;
use super::render::{Prompt, render_step};
use super::session::{Session, SessionStore};
use super::sink::CompletionSink;
use super::state::{ExpectedInput, IntakeStep};

/// Whether the controller acted on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Handled,
    /// Not meant for the form; the caller may route it elsewhere.
    Ignored,
}

/// Result of applying a button to a session.
enum ButtonOutcome {
    Render(Prompt),
    /// Header buttons and the like: acknowledged, nothing else.
    Noop,
    /// Button from a keyboard of another step.
    Stale { expected: IntakeStep, current: IntakeStep },
    Finalize,
}

/// Result of applying free text to a session.
enum TextOutcome {
    Rejected(Prompt),
    Accepted { confirmation: Prompt, next: Prompt },
    Finalize,
    NotExpected,
}

/// Drives the intake state machine.
pub struct FormController {
    sessions: Arc<SessionStore>,
    archive: Arc<ProfileArchive>,
    sink: Option<Arc<dyn CompletionSink>>,
    /// In-flight sink writes.
    sink_tasks: Mutex<JoinSet<()>>,
    default_language: Language,
}

impl FormController {
    pub fn new(
        sessions: Arc<SessionStore>,
        archive: Arc<ProfileArchive>,
        sink: Option<Arc<dyn CompletionSink>>,
        default_language: Language,
    ) -> Self {
        Self {
            sessions,
            archive,
            sink,
            sink_tasks: Mutex::new(JoinSet::new()),
            default_language,
        }
    }

    /// Wait up to `within` for in-flight sink writes; the rest are aborted.
    pub async fn flush(&self, within: Duration) {
        let mut tasks = std::mem::take(&mut *self.sink_tasks.lock().unwrap_or_else(PoisonError::into_inner));
        if tasks.is_empty() {
            return;
        }
        let pending = tasks.len();
        let drained = tokio::time::timeout(within, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        match drained {
            Ok(()) => debug!(pending, "Sink writes flushed"),
            Err(_) => warn!(remaining = tasks.len(), "Aborting unfinished sink writes"),
        }
    }

    fn track(&self, task: impl Future<Output = ()> + Send + 'static) {
        let mut tasks = self.sink_tasks.lock().unwrap_or_else(PoisonError::into_inner);
        // Reap finished writes so the set only holds in-flight ones.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Handle one event. Events for the same user must not be handled
    /// concurrently; the dispatcher guarantees that.
    pub async fn handle(&self, event: &IncomingEvent, channel: &dyn Channel) -> Disposition {
        match &event.kind {
            EventKind::Command { name, args } => self.on_command(event, name, args, channel).await,
            EventKind::Button { callback_id, data, .. } => {
                if let Err(e) = channel.acknowledge(callback_id).await {
                    warn!(user_id = event.user_id, error = %e, "Failed to acknowledge button");
                }
                self.on_button(event, data, channel).await
            }
            EventKind::Text(body) => self.on_text(event, body, channel).await,
        }
    }

    /// Language for replies: the session's if one exists, else the client's.
    pub async fn language_for(&self, event: &IncomingEvent) -> Language {
        match self.sessions.get(event.user_id).await {
            Some(session) => session.language,
            None => Language::resolve(event.language_code.as_deref(), self.default_language),
        }
    }

    async fn on_command(
        &self,
        event: &IncomingEvent,
        name: &str,
        args: &str,
        channel: &dyn Channel,
    ) -> Disposition {
        let target = event.reply_target();
        match name {
            "start" => {
                let lang = self.language_for(event).await;
                let prompt = render_step(IntakeStep::Idle, lang, &Default::default());
                deliver(channel, &target, &prompt).await;
            }
            "intake" => self.begin(event, target, channel).await,
            "cancel" => {
                let lang = self.language_for(event).await;
                let msg = match self.sessions.remove(event.user_id).await {
                    Some(session) => {
                        info!(user_id = event.user_id, step = %session.step, "Intake cancelled");
                        Msg::Cancelled
                    }
                    None => Msg::NothingToCancel,
                };
                deliver(channel, &target, &Prompt::text(text(lang, msg))).await;
            }
            "feedback" => {
                let lang = self.language_for(event).await;
                let feedback = args.trim();
                if feedback.is_empty() {
                    deliver(channel, &target, &Prompt::text(text(lang, Msg::FeedbackUsage))).await;
                } else {
                    self.spawn_feedback(event.user_id, feedback.to_string());
                    deliver(channel, &target, &Prompt::text(text(lang, Msg::FeedbackThanks))).await;
                }
            }
            "help" => {
                let lang = self.language_for(event).await;
                deliver(channel, &target, &Prompt::text(text(lang, Msg::Help))).await;
            }
            other => {
                debug!(user_id = event.user_id, command = other, "Command not handled by intake");
                return Disposition::Ignored;
            }
        }
        Disposition::Handled
    }

    /// Start (or restart) the intake and ask for age and sex.
    async fn begin(&self, event: &IncomingEvent, target: MessageTarget, channel: &dyn Channel) {
        let lang = Language::resolve(event.language_code.as_deref(), self.default_language);
        self.sessions.start(event.user_id, lang).await;
        ask_age_sex(event, lang, &target, channel).await;
    }

    async fn on_button(&self, event: &IncomingEvent, data: &str, channel: &dyn Channel) -> Disposition {
        let Some(action) = FormAction::parse(data) else {
            debug!(user_id = event.user_id, data, "Ignoring unrecognized button");
            return Disposition::Ignored;
        };

        let target = event.reply_target();
        // The start button only opens a form; with one in progress it is a
        // stale keyboard and falls through to the step check below.
        if action == FormAction::Start {
            let lang = Language::resolve(event.language_code.as_deref(), self.default_language);
            if self.sessions.start_if_absent(event.user_id, lang).await {
                ask_age_sex(event, lang, &target, channel).await;
                return Disposition::Handled;
            }
        }

        let outcome = self
            .sessions
            .update(event.user_id, |session| apply_button(session, action))
            .await;

        match outcome {
            None => {
                debug!(user_id = event.user_id, data, "Ignoring button without a session");
                Disposition::Ignored
            }
            Some(ButtonOutcome::Stale { expected, current }) => {
                debug!(
                    user_id = event.user_id,
                    data,
                    %expected,
                    %current,
                    "Ignoring button from a stale keyboard"
                );
                Disposition::Ignored
            }
            Some(ButtonOutcome::Noop) => Disposition::Handled,
            Some(ButtonOutcome::Render(prompt)) => {
                deliver(channel, &target, &prompt).await;
                Disposition::Handled
            }
            Some(ButtonOutcome::Finalize) => {
                self.finalize(event, Medications::NoneReported, target, channel).await
            }
        }
    }

    async fn on_text(&self, event: &IncomingEvent, body: &str, channel: &dyn Channel) -> Disposition {
        let outcome = self
            .sessions
            .update(event.user_id, |session| apply_text(session, body))
            .await
            .unwrap_or(TextOutcome::NotExpected);

        let target = event.reply_target();
        match outcome {
            TextOutcome::NotExpected => Disposition::Ignored,
            TextOutcome::Rejected(prompt) => {
                debug!(user_id = event.user_id, "Age/sex answer rejected");
                deliver(channel, &target, &prompt).await;
                Disposition::Handled
            }
            TextOutcome::Accepted { confirmation, next } => {
                deliver(channel, &target, &confirmation).await;
                deliver(channel, &target, &next).await;
                Disposition::Handled
            }
            TextOutcome::Finalize => {
                let meds = Medications::Reported(body.trim().to_string());
                self.finalize(event, meds, target, channel).await
            }
        }
    }

    /// Close the session: archive the profile, hand it to the sink, thank the user.
    async fn finalize(
        &self,
        event: &IncomingEvent,
        medications: Medications,
        target: MessageTarget,
        channel: &dyn Channel,
    ) -> Disposition {
        let Some(session) = self
            .sessions
            .remove_if(event.user_id, |s| s.step == IntakeStep::Meds)
            .await
        else {
            return Disposition::Ignored;
        };

        let mut draft = session.draft;
        draft.medications = Some(medications);
        let profile = FinishedProfile::new(event.user_id, session.language, draft);

        info!(user_id = event.user_id, "Intake completed");
        self.archive.insert(profile.clone()).await;
        self.spawn_profile(profile.clone());

        let prompt = render_step(IntakeStep::Done, session.language, &profile.draft);
        deliver(channel, &target, &prompt).await;
        Disposition::Handled
    }

    fn spawn_profile(&self, profile: FinishedProfile) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        self.track(async move {
            match sink.save_profile(&profile).await {
                Ok(()) => debug!(user_id = profile.user_id, sink = sink.name(), "Profile persisted"),
                Err(e) => warn!(
                    user_id = profile.user_id,
                    sink = sink.name(),
                    error = %e,
                    "Failed to persist finished profile"
                ),
            }
        });
    }

    fn spawn_feedback(&self, user_id: UserId, feedback: String) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        self.track(async move {
            if let Err(e) = sink.save_feedback(user_id, &feedback).await {
                warn!(user_id, sink = sink.name(), error = %e, "Failed to persist feedback");
            }
        });
    }
}

fn apply_button(session: &mut Session, action: FormAction) -> ButtonOutcome {
    if action.step() != session.step {
        return ButtonOutcome::Stale {
            expected: action.step(),
            current: session.step,
        };
    }

    let advance = match action {
        FormAction::ToggleChronic(condition) => {
            session.draft.toggle_chronic(condition);
            false
        }
        FormAction::ChooseGoal(goal) => {
            session.draft.goal = Some(goal);
            true
        }
        FormAction::SetHabit(choice) => {
            session.draft.set_habit(choice);
            false
        }
        FormAction::ToggleComplaint(complaint) => {
            session.draft.toggle_complaint(complaint);
            false
        }
        FormAction::ChronicDone | FormAction::HabitsDone | FormAction::ComplaintsDone => true,
        FormAction::MedsNone => return ButtonOutcome::Finalize,
        FormAction::HabitHeader(_) | FormAction::Start => return ButtonOutcome::Noop,
    };

    if advance {
        if let Err(e) = session.advance() {
            warn!(error = %e, "Failed to advance intake step");
            return ButtonOutcome::Noop;
        }
    }
    ButtonOutcome::Render(render_step(session.step, session.language, &session.draft))
}

fn apply_text(session: &mut Session, body: &str) -> TextOutcome {
    let lang = session.language;
    match session.expected_input {
        None => TextOutcome::NotExpected,
        Some(ExpectedInput::Meds) => TextOutcome::Finalize,
        Some(ExpectedInput::AgeSex) => {
            let Some(parsed) = parse_age_sex(body) else {
                return TextOutcome::Rejected(Prompt::text(text(lang, Msg::AgeSexInvalid)));
            };
            session.draft.age = Some(parsed.age);
            session.draft.sex = parsed.sex;
            if let Err(e) = session.advance() {
                warn!(error = %e, "Failed to advance intake step");
                return TextOutcome::NotExpected;
            }

            let age = parsed.age.to_string();
            let confirmation = fill(
                text(lang, Msg::AgeSexConfirmed),
                &[("age", age.as_str()), ("sex", parsed.sex.label(lang))],
            );
            TextOutcome::Accepted {
                confirmation: Prompt::text(confirmation),
                next: render_step(session.step, lang, &session.draft),
            }
        }
    }
}

async fn ask_age_sex(event: &IncomingEvent, lang: Language, target: &MessageTarget, channel: &dyn Channel) {
    info!(user_id = event.user_id, language = lang.tag(), "Intake started");
    let prompt = render_step(IntakeStep::AgeSex, lang, &Default::default());
    deliver(channel, target, &prompt).await;
}

/// Send a prompt, logging (not propagating) transport failures.
async fn deliver(channel: &dyn Channel, target: &MessageTarget, prompt: &Prompt) {
    if let Err(e) = channel.send_or_edit(target, prompt).await {
        warn!(chat_id = target.chat_id, channel = channel.name(), error = %e, "Failed to send prompt");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::intake::model::{
        Alcohol, ChronicCondition, Complaint, Goal, HabitChoice, HabitGroup, ProfileDraft, Sex,
        Smoking,
    };
    use crate::intake::render::SELECTED;
    use crate::intake::testing::{Effect, RecordingChannel, RecordingSink, Saved};

    const USER: UserId = 7;
    const CHAT: i64 = 70;

    struct Harness {
        controller: FormController,
        sessions: Arc<SessionStore>,
        archive: Arc<ProfileArchive>,
        channel: RecordingChannel,
        saved: mpsc::UnboundedReceiver<Saved>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_sink(false)
        }

        fn with_sink(fail: bool) -> Self {
            let sessions = SessionStore::new(Duration::from_secs(3600));
            let archive = ProfileArchive::new();
            let (sink, saved) = RecordingSink::new(fail);
            let controller = FormController::new(
                Arc::clone(&sessions),
                Arc::clone(&archive),
                Some(Arc::new(sink)),
                Language::Ru,
            );
            Self {
                controller,
                sessions,
                archive,
                channel: RecordingChannel::default(),
                saved,
            }
        }

        async fn command(&self, name: &str) -> Disposition {
            self.command_args(name, "").await
        }

        async fn command_args(&self, name: &str, args: &str) -> Disposition {
            let event = IncomingEvent::command(USER, CHAT, name, args).with_language("en");
            self.controller.handle(&event, &self.channel).await
        }

        async fn press(&self, data: &str) -> Disposition {
            let event = IncomingEvent::button(USER, CHAT, "cb", Some(500), data).with_language("en");
            self.controller.handle(&event, &self.channel).await
        }

        async fn say(&self, body: &str) -> Disposition {
            let event = IncomingEvent::text(USER, CHAT, body).with_language("en");
            self.controller.handle(&event, &self.channel).await
        }

        async fn session(&self) -> Option<Session> {
            self.sessions.get(USER).await
        }

        async fn step(&self) -> Option<IntakeStep> {
            self.session().await.map(|s| s.step)
        }

        async fn draft(&self) -> ProfileDraft {
            self.session().await.expect("session exists").draft
        }

        /// Drive the form up to the given step with minimal answers.
        async fn advance_to(&self, step: IntakeStep) {
            self.command("intake").await;
            let script: [(IntakeStep, &str); 5] = [
                (IntakeStep::AgeSex, "30 f"),
                (IntakeStep::Chronic, "form:chronic:done:_"),
                (IntakeStep::Goal, "form:goal:energy"),
                (IntakeStep::Habits, "form:habits:done:_"),
                (IntakeStep::Complaints, "form:complaints:done:_"),
            ];
            for (at, input) in script {
                if self.step().await == Some(step) {
                    return;
                }
                assert_eq!(self.step().await, Some(at));
                if input.starts_with("form:") {
                    self.press(input).await;
                } else {
                    self.say(input).await;
                }
            }
            assert_eq!(self.step().await, Some(step));
        }

        async fn next_saved(&mut self) -> Saved {
            timeout(Duration::from_secs(1), self.saved.recv())
                .await
                .expect("sink called in time")
                .expect("sink channel open")
        }
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let mut h = Harness::new();

        assert_eq!(h.command("start").await, Disposition::Handled);
        assert!(h.session().await.is_none(), "welcome does not open a session");
        assert_eq!(h.press("form:start:go").await, Disposition::Handled);
        assert_eq!(h.step().await, Some(IntakeStep::AgeSex));

        h.say("30 f").await;
        h.press("form:chronic:toggle:cvd").await;
        h.press("form:chronic:done:_").await;
        h.press("form:goal:longevity").await;
        h.press("form:habits:smoke:none").await;
        h.press("form:habits:done:_").await;
        h.press("form:complaints:toggle:fatigue").await;
        h.press("form:complaints:done:_").await;
        assert_eq!(h.step().await, Some(IntakeStep::Meds));
        assert_eq!(h.say("vitamin d").await, Disposition::Handled);

        let expected = ProfileDraft {
            age: Some(30),
            sex: Sex::Female,
            chronic_conditions: BTreeSet::from([ChronicCondition::Cvd]),
            goal: Some(Goal::Longevity),
            habit_smoke: Some(Smoking::None),
            habit_alcohol: None,
            habit_activity: None,
            habit_sleep: None,
            complaints: BTreeSet::from([Complaint::Fatigue]),
            medications: Some(Medications::Reported("vitamin d".into())),
        };

        match h.next_saved().await {
            Saved::Profile(profile) => {
                assert_eq!(profile.user_id, USER);
                assert_eq!(profile.draft, expected);
            }
            other => panic!("expected profile, got {other:?}"),
        }
        // Exactly once
        assert!(timeout(Duration::from_millis(50), h.saved.recv()).await.is_err());

        assert!(h.session().await.is_none());
        assert_eq!(h.archive.get(USER).await.unwrap().draft, expected);
        assert_eq!(
            h.channel.last_prompt().unwrap().text,
            text(Language::En, Msg::Completed)
        );
    }

    #[tokio::test]
    async fn intake_command_starts_immediately_in_client_language() {
        let h = Harness::new();
        h.command("intake").await;
        let session = h.session().await.unwrap();
        assert_eq!(session.language, Language::En);
        assert_eq!(session.expected_input, Some(ExpectedInput::AgeSex));
        assert_eq!(h.channel.last_prompt().unwrap().text, text(Language::En, Msg::AskAgeSex));
    }

    #[tokio::test]
    async fn unknown_client_language_falls_back_to_default() {
        let h = Harness::new();
        let event = IncomingEvent::command(USER, CHAT, "intake", "").with_language("de");
        h.controller.handle(&event, &h.channel).await;
        assert_eq!(h.session().await.unwrap().language, Language::Ru);
    }

    #[tokio::test]
    async fn invalid_age_reprompts_and_keeps_state() {
        let h = Harness::new();
        h.command("intake").await;
        let before = h.session().await.unwrap();

        for body in ["женщина", "abc"] {
            assert_eq!(h.say(body).await, Disposition::Handled);
            let after = h.session().await.unwrap();
            assert_eq!(after.step, IntakeStep::AgeSex);
            assert_eq!(after.draft, before.draft);
            assert_eq!(h.channel.last_prompt().unwrap().text, text(Language::En, Msg::AgeSexInvalid));
        }
    }

    #[tokio::test]
    async fn age_sex_confirms_and_renders_empty_chronic() {
        let h = Harness::new();
        h.command("intake").await;
        h.channel.take();

        h.say("42, мужчина").await;
        let draft = h.draft().await;
        assert_eq!(draft.age, Some(42));
        assert_eq!(draft.sex, Sex::Male);

        let prompts = h.channel.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].text, "Got it: age 42, sex male.");
        assert_eq!(prompts[1], render_step(IntakeStep::Chronic, Language::En, &ProfileDraft {
            age: Some(42),
            sex: Sex::Male,
            ..Default::default()
        }));
        assert_eq!(h.session().await.unwrap().expected_input, None);
    }

    #[tokio::test]
    async fn age_without_sex_proceeds_unspecified() {
        let h = Harness::new();
        h.command("intake").await;
        h.say("64").await;
        assert_eq!(h.step().await, Some(IntakeStep::Chronic));
        assert_eq!(h.draft().await.sex, Sex::Unspecified);
    }

    #[tokio::test]
    async fn chronic_toggles_rerender_in_place() {
        let h = Harness::new();
        h.advance_to(IntakeStep::Chronic).await;
        h.channel.take();

        h.press("form:chronic:toggle:diabetes").await;
        h.press("form:chronic:toggle:none").await;
        assert_eq!(
            h.draft().await.chronic_conditions,
            BTreeSet::from([ChronicCondition::None])
        );
        h.press("form:chronic:toggle:gi").await;
        assert_eq!(h.draft().await.chronic_conditions, BTreeSet::from([ChronicCondition::Gi]));

        let effects = h.channel.effects();
        // Each press: ack, then an edit of the keyboard message
        assert_eq!(effects.len(), 6);
        for pair in effects.chunks(2) {
            assert_eq!(pair[0], Effect::Ack("cb".into()));
            match &pair[1] {
                Effect::Send(target, _) => assert_eq!(target.message_id, Some(500)),
                other => panic!("expected edit, got {other:?}"),
            }
        }

        let last = h.channel.last_prompt().unwrap();
        assert_eq!(last, render_step(IntakeStep::Chronic, Language::En, &h.draft().await));
        let selected: Vec<_> = last
            .keyboard
            .unwrap()
            .into_iter()
            .flatten()
            .filter(|b| b.label.starts_with(SELECTED))
            .map(|b| b.action)
            .collect();
        assert_eq!(selected, vec!["form:chronic:toggle:gi".to_string()]);
    }

    #[tokio::test]
    async fn double_toggle_restores_display() {
        let h = Harness::new();
        h.advance_to(IntakeStep::Complaints).await;
        let before = render_step(IntakeStep::Complaints, Language::En, &h.draft().await);

        h.press("form:complaints:toggle:anxiety").await;
        h.press("form:complaints:toggle:anxiety").await;
        assert_eq!(h.channel.last_prompt().unwrap(), before);
        assert!(h.draft().await.complaints.is_empty());
    }

    #[tokio::test]
    async fn chronic_done_with_empty_selection_advances() {
        let h = Harness::new();
        h.advance_to(IntakeStep::Chronic).await;
        h.press("form:chronic:done:_").await;
        assert_eq!(h.step().await, Some(IntakeStep::Goal));
        assert!(h.draft().await.chronic_conditions.is_empty());
    }

    #[tokio::test]
    async fn goal_first_choice_commits() {
        let h = Harness::new();
        h.advance_to(IntakeStep::Goal).await;
        h.press("form:goal:stress").await;
        assert_eq!(h.step().await, Some(IntakeStep::Habits));
        assert_eq!(h.draft().await.goal, Some(Goal::Stress));

        // The goal keyboard is now stale.
        assert_eq!(h.press("form:goal:weight").await, Disposition::Ignored);
        assert_eq!(h.draft().await.goal, Some(Goal::Stress));
    }

    #[tokio::test]
    async fn habits_are_independent_and_headers_are_noops() {
        let h = Harness::new();
        h.advance_to(IntakeStep::Habits).await;

        h.press("form:habits:smoke:daily").await;
        h.press("form:habits:alcohol:weekly").await;
        h.channel.take();

        assert_eq!(h.press("form:habits:header:smoke").await, Disposition::Handled);
        assert_eq!(h.channel.take(), vec![Effect::Ack("cb".into())]);

        let draft = h.draft().await;
        assert_eq!(draft.habit(HabitGroup::Smoke), Some(HabitChoice::Smoke(Smoking::Daily)));
        assert_eq!(draft.habit_alcohol, Some(Alcohol::Weekly));

        h.press("form:habits:done:_").await;
        assert_eq!(h.step().await, Some(IntakeStep::Complaints));
    }

    #[tokio::test]
    async fn reaching_meds_requires_every_done() {
        let h = Harness::new();
        h.advance_to(IntakeStep::Chronic).await;
        for _ in 0..5 {
            h.press("form:chronic:toggle:thyroid").await;
        }
        assert_eq!(h.step().await, Some(IntakeStep::Chronic));
        h.press("form:chronic:done:_").await;
        h.press("form:goal:weight").await;
        h.press("form:habits:sleep:long").await;
        // Skipping ahead is ignored
        h.press("form:complaints:done:_").await;
        assert_eq!(h.step().await, Some(IntakeStep::Habits));
        h.press("form:habits:done:_").await;
        h.press("form:complaints:toggle:skin").await;
        assert_eq!(h.step().await, Some(IntakeStep::Complaints));
        h.press("form:complaints:done:_").await;
        assert_eq!(h.step().await, Some(IntakeStep::Meds));
        assert_eq!(h.session().await.unwrap().expected_input, Some(ExpectedInput::Meds));
    }

    #[tokio::test]
    async fn literal_none_medication_is_plain_text() {
        let mut h = Harness::new();
        h.advance_to(IntakeStep::Meds).await;
        h.say("  none  ").await;
        match h.next_saved().await {
            Saved::Profile(p) => {
                assert_eq!(p.draft.medications, Some(Medications::Reported("none".into())))
            }
            other => panic!("expected profile, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn meds_none_button_records_sentinel() {
        let mut h = Harness::new();
        h.advance_to(IntakeStep::Meds).await;
        assert_eq!(h.press("form:meds:none:_").await, Disposition::Handled);
        match h.next_saved().await {
            Saved::Profile(p) => assert_eq!(p.draft.medications, Some(Medications::NoneReported)),
            other => panic!("expected profile, got {other:?}"),
        }
        assert!(h.session().await.is_none());
    }

    #[tokio::test]
    async fn sink_failure_still_acknowledges_user() {
        let mut h = Harness::with_sink(true);
        h.advance_to(IntakeStep::Meds).await;
        h.say("metformin").await;

        assert!(matches!(h.next_saved().await, Saved::Profile(_)));
        assert!(h.session().await.is_none());
        assert_eq!(h.channel.last_prompt().unwrap().text, text(Language::En, Msg::Completed));
    }

    #[tokio::test]
    async fn flush_waits_for_sink_writes() {
        let mut h = Harness::new();
        h.advance_to(IntakeStep::Meds).await;
        h.say("metformin").await;
        h.command_args("feedback", "quick").await;

        h.controller.flush(Duration::from_secs(1)).await;
        let mut writes = Vec::new();
        while let Ok(saved) = h.saved.try_recv() {
            writes.push(saved);
        }
        assert_eq!(writes.len(), 2);
        assert!(writes.iter().any(|w| matches!(w, Saved::Profile(p) if p.user_id == USER)));
        assert!(writes.contains(&Saved::Feedback(USER, "quick".into())));

        // Nothing pending: returns at once.
        timeout(Duration::from_millis(50), h.controller.flush(Duration::from_secs(60)))
            .await
            .expect("empty flush is immediate");
    }

    #[tokio::test]
    async fn works_without_a_sink() {
        let sessions = SessionStore::new(Duration::from_secs(60));
        let archive = ProfileArchive::new();
        let controller = FormController::new(Arc::clone(&sessions), Arc::clone(&archive), None, Language::En);
        let channel = RecordingChannel::default();

        controller.handle(&IncomingEvent::command(1, 1, "intake", ""), &channel).await;
        sessions.update(1, |s| s.step = IntakeStep::Meds).await;
        sessions.update(1, |s| s.expected_input = Some(ExpectedInput::Meds)).await;
        controller.handle(&IncomingEvent::text(1, 1, "aspirin"), &channel).await;

        assert!(sessions.is_empty().await);
        assert_eq!(archive.len().await, 1);
    }

    #[tokio::test]
    async fn text_without_expectation_is_ignored() {
        let h = Harness::new();
        assert_eq!(h.say("hello").await, Disposition::Ignored);

        h.advance_to(IntakeStep::Goal).await;
        h.channel.take();
        assert_eq!(h.say("weight please").await, Disposition::Ignored);
        assert!(h.channel.effects().is_empty());
        assert_eq!(h.step().await, Some(IntakeStep::Goal));
    }

    #[tokio::test]
    async fn unrecognized_buttons_are_acked_and_ignored() {
        let h = Harness::new();
        h.advance_to(IntakeStep::Chronic).await;
        let before = h.session().await.unwrap().draft;
        h.channel.take();

        for data in ["form:chronic:toggle:cancer", "other:thing", "form:nope:done:_"] {
            assert_eq!(h.press(data).await, Disposition::Ignored);
        }
        assert_eq!(h.draft().await, before);
        assert!(h.channel.effects().iter().all(|e| matches!(e, Effect::Ack(_))));
    }

    #[tokio::test]
    async fn button_without_session_is_ignored() {
        let h = Harness::new();
        assert_eq!(h.press("form:goal:weight").await, Disposition::Ignored);
        assert!(h.session().await.is_none());
    }

    #[tokio::test]
    async fn restart_discards_progress() {
        let h = Harness::new();
        h.advance_to(IntakeStep::Goal).await;
        h.command("intake").await;
        assert_eq!(h.step().await, Some(IntakeStep::AgeSex));
        assert_eq!(h.draft().await, ProfileDraft::default());
    }

    #[tokio::test]
    async fn start_button_mid_form_keeps_progress() {
        let h = Harness::new();
        h.advance_to(IntakeStep::Habits).await;
        let before = h.draft().await;
        h.channel.take();

        assert_eq!(h.press("form:start:go").await, Disposition::Ignored);
        assert_eq!(h.step().await, Some(IntakeStep::Habits));
        assert_eq!(h.draft().await, before);
        assert_eq!(h.channel.take(), vec![Effect::Ack("cb".into())]);
    }

    #[tokio::test]
    async fn cancel_drops_session() {
        let h = Harness::new();
        h.advance_to(IntakeStep::Habits).await;
        h.command("cancel").await;
        assert!(h.session().await.is_none());
        assert_eq!(h.channel.last_prompt().unwrap().text, text(Language::En, Msg::Cancelled));

        h.command("cancel").await;
        assert_eq!(h.channel.last_prompt().unwrap().text, text(Language::En, Msg::NothingToCancel));
    }

    #[tokio::test]
    async fn feedback_goes_to_sink() {
        let mut h = Harness::new();
        h.command_args("feedback", "").await;
        assert_eq!(h.channel.last_prompt().unwrap().text, text(Language::En, Msg::FeedbackUsage));

        h.command_args("feedback", "  love it ").await;
        assert_eq!(h.next_saved().await, Saved::Feedback(USER, "love it".into()));
        assert_eq!(h.channel.last_prompt().unwrap().text, text(Language::En, Msg::FeedbackThanks));
    }

    #[tokio::test]
    async fn unknown_command_is_ignored() {
        let h = Harness::new();
        assert_eq!(h.command("weather").await, Disposition::Ignored);
        assert!(h.channel.effects().is_empty());
    }
}
