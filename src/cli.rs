use crate::api::{CampusApi, Client, Credential};
use crate::config::Config;
use crate::error::{ActionError, Fallback};
use crate::filter::{self, EventFilter, Facet, PostFilter};
use crate::forms::{self, AdminRegistration, EventDraft, PostDraft, UserRegistration};
use crate::models::{AuthSession, Role};
use crate::render;
use crate::session::{Session, SessionStore};
use crate::transcript::Transcript;
use crate::upload::{ImageFile, ImgBbHost};
use crate::views::{self, AdminView, EventsView, FeedView};
use crate::{AdminCommand, Args, Command};
use anyhow::Result;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::io::{self, Write};

pub struct Context {
    pub args: Args,
    pub config: Config,
    pub store: SessionStore,
    pub run_id: String,
    pub client: RefCell<Client>,
    pub host: ImgBbHost,
    pub transcript: RefCell<Transcript>,
    pub session: RefCell<Option<Session>>,
    pub feed: RefCell<FeedView>,
    pub events: RefCell<EventsView>,
    pub admin: RefCell<AdminView>,
}

impl Context {
    fn viewer(&self) -> Option<String> {
        self.session
            .borrow()
            .as_ref()
            .map(|s| s.profile.id().to_string())
    }
}

pub fn credential_for(session: &Session) -> Credential {
    Credential {
        role: session.role(),
        token: session.token.clone(),
    }
}

fn verbose(ctx: &Context, message: &str) {
    if ctx.args.verbose || ctx.args.debug {
        eprintln!("[VERBOSE] {}", message);
    }
}

/// One REPL line, parsed with the same subcommands as the binary
#[derive(Parser, Debug)]
#[command(name = "campus", no_binary_name = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

/// Split and parse a REPL line. `Ok(None)` for blank input; `Err` carries
/// clap's rendered usage or help text.
fn parse_line(line: &str) -> std::result::Result<Option<Command>, String> {
    let words = shell_words::split(line).map_err(|e| format!("Invalid input: {}", e))?;
    if words.is_empty() {
        return Ok(None);
    }
    Line::try_parse_from(words)
        .map(|l| Some(l.command))
        .map_err(|e| e.render().to_string())
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Register { .. } => "register",
        Command::Login { .. } => "login",
        Command::AdminRegister { .. } => "admin-register",
        Command::Logout => "logout",
        Command::Whoami => "whoami",
        Command::Posts { .. } => "posts",
        Command::Facets => "facets",
        Command::Post { .. } => "post",
        Command::Like { .. } => "like",
        Command::Comments { .. } => "comments",
        Command::Comment { .. } => "comment",
        Command::Events { .. } => "events",
        Command::Event { .. } => "event",
        Command::Rsvp { .. } => "rsvp",
        Command::Admin(AdminCommand::Stats) => "admin stats",
        Command::Admin(AdminCommand::Users) => "admin users",
        Command::Admin(AdminCommand::DeleteUser { .. }) => "admin delete-user",
    }
}

pub fn run_once(ctx: &Context, command: &Command) -> Result<()> {
    let name = command_name(command);
    let _ = ctx.transcript.borrow_mut().command(name);

    let result = execute(ctx, command);

    if let Some(action) = result.as_ref().err().and_then(|e| e.downcast_ref::<ActionError>()) {
        if !action.error.is_local() {
            verbose(ctx, &format!("Cause: {}", action.error));
        }
    }
    let error = result.as_ref().err().map(|e| e.to_string());
    let _ = ctx
        .transcript
        .borrow_mut()
        .action_result(name, result.is_ok(), error.as_deref());
    result
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let history = crate::config::home_dir().join("history.txt");
    let _ = rl.load_history(&history);

    println!("campus - type help for commands, exit to quit");
    if let Some(session) = ctx.session.borrow().as_ref() {
        println!("Logged in as {} ({})", session.profile.name(), session.role());
    }

    loop {
        match rl.readline("campus> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if line == "exit" || line == "quit" {
                    break;
                }

                match parse_line(line) {
                    Ok(Some(command)) => {
                        if let Err(e) = run_once(&ctx, &command) {
                            eprintln!("Error: {}", e);
                        }
                    }
                    Ok(None) => {}
                    Err(usage) => eprintln!("{}", usage.trim_end()),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history) {
        verbose(&ctx, &format!("Could not save history: {}", e));
    }
    verbose(
        &ctx,
        &format!(
            "Run {} logged to {}",
            ctx.run_id,
            ctx.transcript.borrow().path.display()
        ),
    );
    Ok(())
}

fn execute(ctx: &Context, command: &Command) -> Result<()> {
    match command {
        Command::Register {
            name,
            email,
            password,
            department,
            year,
            interests,
        } => {
            let form = UserRegistration {
                name: name.clone(),
                email: email.clone(),
                password: password.clone(),
                department: department.clone(),
                year: year.clone(),
                interests: interests.clone(),
            }
            .validate()
            .or_say("Registration failed. Please try again.")?;
            let auth = ctx
                .client
                .borrow()
                .register_user(&form)
                .or_say("Registration failed. Please try again.")?;
            establish(ctx, auth)?;
        }
        Command::Login {
            email,
            password,
            admin,
        } => {
            let role = if *admin { Role::Admin } else { Role::User };
            let credentials =
                forms::login(email, password).or_say("Login failed. Please try again.")?;
            let auth = ctx
                .client
                .borrow()
                .login(role, &credentials)
                .or_say("Login failed. Please try again.")?;
            establish(ctx, auth)?;
        }
        Command::AdminRegister {
            name,
            email,
            password,
            department,
            designation,
        } => {
            let form = AdminRegistration {
                name: name.clone(),
                email: email.clone(),
                password: password.clone(),
                department: department.clone(),
                designation: designation.clone(),
            }
            .validate()
            .or_say("Registration failed. Please try again.")?;
            let auth = ctx
                .client
                .borrow()
                .register_admin(&form)
                .or_say("Registration failed. Please try again.")?;
            establish(ctx, auth)?;
        }
        Command::Logout => {
            ctx.store.clear()?;
            let _ = ctx.transcript.borrow_mut().session_cleared();
            ctx.client.borrow_mut().set_credential(None);
            *ctx.session.borrow_mut() = None;
            reset_views(ctx);
            println!("Logged out");
        }
        Command::Whoami => whoami(ctx)?,
        Command::Posts {
            search,
            tag,
            department,
            refresh,
        } => {
            let client = ctx.client.borrow();
            let mut feed = ctx.feed.borrow_mut();
            if *refresh {
                feed.refresh(&*client)?;
            } else {
                feed.ensure_loaded(&*client)?;
            }
            let filter = PostFilter {
                query: search.trim().to_string(),
                tag: Facet::parse(tag),
                department: Facet::parse(department),
            };
            let shown = filter.apply(feed.posts());
            if !filter.is_empty() {
                verbose(
                    ctx,
                    &format!("{} of {} posts match", shown.len(), feed.posts().len()),
                );
            }
            println!(
                "{}",
                render::feed(&shown, feed.posts().len(), ctx.viewer().as_deref())
            );
        }
        Command::Facets => {
            let client = ctx.client.borrow();
            let mut feed = ctx.feed.borrow_mut();
            feed.ensure_loaded(&*client)?;
            println!("{}", render::facets("Tags", &filter::tag_options(feed.posts())));
            println!(
                "{}",
                render::facets(
                    "Post departments",
                    &filter::post_department_options(feed.posts())
                )
            );
            if client.credential().is_some() {
                let mut events = ctx.events.borrow_mut();
                events.ensure_loaded(&*client)?;
                println!(
                    "{}",
                    render::facets(
                        "Event departments",
                        &filter::event_department_options(events.events())
                    )
                );
            }
        }
        Command::Post {
            content,
            tags,
            image,
        } => {
            let mut draft = PostDraft {
                content: content.clone(),
                tags: tags.clone(),
                image: None,
            };
            if let Some(path) = image {
                draft
                    .select_image(path, ctx.config.images.max_bytes)
                    .or_say("Failed to create post")?;
            }
            let created =
                ctx.feed
                    .borrow_mut()
                    .create_post(&*ctx.client.borrow(), &ctx.host, &draft)?;
            log_image(ctx, draft.image.as_ref(), created.image_warning.as_deref());
            println!("Post created [{}]", created.item.id);
            warn_stale(ctx, created.stale.as_ref());
        }
        Command::Like { post_id } => {
            let viewer = ctx.viewer();
            let mut feed = ctx.feed.borrow_mut();
            let applied = feed.like(&*ctx.client.borrow(), post_id)?;
            warn_stale(ctx, applied.stale.as_ref());
            if let Some(post) = feed.posts().iter().find(|p| &p.id == post_id) {
                let comments = feed.comments(post_id).map(|c| c.len());
                println!("{}", render::post(post, viewer.as_deref(), comments));
            }
        }
        Command::Comments { post_id } => {
            let mut feed = ctx.feed.borrow_mut();
            let comments = feed.refresh_comments(&*ctx.client.borrow(), post_id)?;
            println!("{}", render::comments(comments));
        }
        Command::Comment { post_id, text } => {
            let mut feed = ctx.feed.borrow_mut();
            let applied = feed.add_comment(&*ctx.client.borrow(), post_id, text)?;
            warn_stale(ctx, applied.stale.as_ref());
            if let Some(comments) = feed.comments(post_id) {
                println!("{}", render::comments(comments));
            }
        }
        Command::Events {
            search,
            department,
            refresh,
        } => {
            let client = ctx.client.borrow();
            let mut events = ctx.events.borrow_mut();
            if *refresh {
                events.refresh(&*client)?;
            } else {
                events.ensure_loaded(&*client)?;
            }
            let filter = EventFilter {
                query: search.trim().to_string(),
                department: Facet::parse(department),
            };
            let shown = filter.apply(events.events());
            if !filter.is_empty() {
                verbose(
                    ctx,
                    &format!("{} of {} events match", shown.len(), events.events().len()),
                );
            }
            println!(
                "{}",
                render::events(&shown, events.events().len(), ctx.viewer().as_deref())
            );
        }
        Command::Event {
            title,
            date,
            description,
            location,
            department,
            image,
        } => {
            let mut draft = EventDraft {
                title: title.clone(),
                description: description.clone(),
                date: date.clone(),
                location: location.clone(),
                department: department.clone(),
                image: None,
            };
            if let Some(path) = image {
                draft
                    .select_image(path, ctx.config.images.max_bytes)
                    .or_say("Failed to create event")?;
            }
            let created = ctx.admin.borrow_mut().create_event(
                &*ctx.client.borrow(),
                &ctx.host,
                &mut ctx.events.borrow_mut(),
                &draft,
            )?;
            log_image(ctx, draft.image.as_ref(), created.image_warning.as_deref());
            println!("Event created [{}]", created.item.id);
            warn_stale(ctx, created.stale.as_ref());
        }
        Command::Rsvp { event_id } => {
            let viewer = ctx.viewer();
            let mut events = ctx.events.borrow_mut();
            let applied = events.rsvp(&*ctx.client.borrow(), event_id)?;
            if let Some(message) = &applied.value {
                println!("{}", message);
            }
            warn_stale(ctx, applied.stale.as_ref());
            if let Some(event) = events.events().iter().find(|e| &e.id == event_id) {
                println!("{}", render::event(event, viewer.as_deref()));
            }
        }
        Command::Admin(sub) => admin(ctx, sub)?,
    }
    Ok(())
}

fn admin(ctx: &Context, command: &AdminCommand) -> Result<()> {
    let client = ctx.client.borrow();
    let mut admin = ctx.admin.borrow_mut();
    match command {
        AdminCommand::Stats => {
            let mut events = ctx.events.borrow_mut();
            let mut failures = admin.refresh_all(&*client, &mut events);
            // Nothing loaded: report the first cause only
            if failures.len() == 3 {
                return Err(failures.remove(0).into());
            }
            for e in &failures {
                eprintln!("Error: {}", e);
            }
            println!("{}", render::totals(&admin.totals()));
            println!(
                "{} loaded",
                render::pluralize(events.events().len(), "event")
            );
        }
        AdminCommand::Users => {
            admin.refresh_users(&*client)?;
            println!("{}", render::users(admin.users()));
        }
        AdminCommand::DeleteUser { user_id } => {
            let label = admin
                .users()
                .iter()
                .find(|u| &u.id == user_id)
                .map(|u| format!("{} <{}>", u.name, u.email))
                .unwrap_or_else(|| user_id.clone());
            if !ctx.args.yes && !confirm(&format!("Delete user {}?", label)) {
                println!("Cancelled");
                return Ok(());
            }
            let applied = admin.delete_user(&*client, user_id)?;
            println!("User deleted");
            warn_stale(ctx, applied.stale.as_ref());
        }
    }
    Ok(())
}

/// Persist a fresh credential and switch the client over to it
fn establish(ctx: &Context, auth: AuthSession) -> Result<()> {
    ctx.store.save(&auth.token, &auth.profile)?;
    let session = Session {
        token: auth.token,
        profile: auth.profile,
    };
    let _ = ctx
        .transcript
        .borrow_mut()
        .session_saved(session.role().as_str(), session.profile.id());
    verbose(ctx, &format!("Session saved to {}", ctx.store.path().display()));

    ctx.client
        .borrow_mut()
        .set_credential(Some(credential_for(&session)));
    println!("Welcome, {}!", session.profile.name());
    *ctx.session.borrow_mut() = Some(session);
    reset_views(ctx);
    Ok(())
}

/// Working sets belong to an identity; drop them when it changes
fn reset_views(ctx: &Context) {
    *ctx.feed.borrow_mut() = FeedView::default();
    *ctx.events.borrow_mut() = EventsView::default();
    *ctx.admin.borrow_mut() = AdminView::default();
}

fn whoami(ctx: &Context) -> Result<()> {
    let session = ctx.session.borrow();
    let Some(session) = session.as_ref() else {
        println!("Not logged in");
        return Ok(());
    };

    let stats = match views::activity(
        &*ctx.client.borrow(),
        session.profile.id(),
        &mut ctx.feed.borrow_mut(),
        &mut ctx.events.borrow_mut(),
    ) {
        Ok(stats) => Some(stats),
        Err(e) => {
            verbose(ctx, &format!("Activity unavailable: {}", e));
            None
        }
    };

    println!("{}", render::profile(&session.profile, stats));
    Ok(())
}

fn log_image(ctx: &Context, image: Option<&ImageFile>, warning: Option<&str>) {
    let Some(image) = image else {
        return;
    };
    let _ = ctx.transcript.borrow_mut().image_upload(
        &image.file_name(),
        image.media_type,
        image.bytes.len(),
        warning.is_none(),
    );
    if let Some(warning) = warning {
        eprintln!("Warning: {}", warning);
    }
}

/// The change went through but the listing shown may predate it
fn warn_stale(ctx: &Context, stale: Option<&ActionError>) {
    let Some(stale) = stale else {
        return;
    };
    eprintln!("Warning: {}", stale);
    if !stale.error.is_local() {
        verbose(ctx, &format!("Cause: {}", stale.error));
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush().ok();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        let input = input.trim().to_lowercase();
        input == "y" || input == "yes"
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_blank() {
        assert!(parse_line("   ").unwrap().is_none());
    }

    #[test]
    fn test_parse_line_quoted_args() {
        let command = parse_line(r#"comment p1 "great talk, thanks""#)
            .unwrap()
            .unwrap();
        match command {
            Command::Comment { post_id, text } => {
                assert_eq!(post_id, "p1");
                assert_eq!(text, "great talk, thanks");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_filters_default_to_all() {
        let command = parse_line("posts -s hello").unwrap().unwrap();
        match command {
            Command::Posts {
                search,
                tag,
                department,
                refresh,
            } => {
                assert_eq!(search, "hello");
                assert_eq!(Facet::parse(&tag), Facet::All);
                assert_eq!(Facet::parse(&department), Facet::All);
                assert!(!refresh);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_admin_subcommand() {
        let command = parse_line("admin delete-user u42").unwrap().unwrap();
        assert_eq!(command_name(&command), "admin delete-user");
    }

    #[test]
    fn test_parse_line_interests_split_on_commas() {
        let command = parse_line(
            "register --name Ann --email a@x.edu --password pw --department CS --year 2 --interest music,chess --interest art",
        )
        .unwrap()
        .unwrap();
        match command {
            Command::Register { interests, .. } => {
                assert_eq!(interests, vec!["music", "chess", "art"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_errors() {
        assert!(parse_line("frobnicate").is_err());
        assert!(parse_line("like").is_err());
        assert!(parse_line("comment p1 \"unterminated").is_err());
    }
}
