//! CLI command handlers

use anyhow::{Context, Result};
use bytes::Bytes;
use clap_complete::generate;
use colored::Colorize;
use dialoguer::{Confirm, Editor, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{ContentArgs, SessionManager};
use journal::backend::{BackendClient, Entry, EntryFile, SignUpOutcome};
use journal::config::{normalize_url, BackendSettings, Config};
use journal::entries::attachments::{is_pdf, MAX_ATTACHMENT_SIZE};
use journal::entries::draft::{display_date, preview};
use journal::entries::{self, export, AttachmentManager, EntryDraft};
use journal::utils::sanitize_filename;

fn settings() -> Result<BackendSettings> {
    Config::load()?.resolve()
}

async fn signed_in_client() -> Result<BackendClient> {
    let (client, _) = SessionManager::client(&settings()?).await?;
    Ok(client)
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

/// Read entry text from the flags, or open an editor seeded with `initial`
fn read_content(args: ContentArgs, initial: Option<&str>) -> Result<Option<String>> {
    if let Some(content) = args.content {
        return Ok(Some(content));
    }

    if let Some(path) = args.content_file {
        let mut content = String::new();
        if path == Path::new("-") {
            io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read content from stdin")?;
        } else {
            content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
        }
        return Ok(Some(content));
    }

    match initial {
        // Editing: keep the current text unless asked to change it
        Some(_) => Ok(None),
        None => Editor::new()
            .extension(".md")
            .edit("")
            .context("Failed to open editor"),
    }
}

/// Read a PDF from disk, returning its name and contents
///
/// Type and size are checked here so that `new` can refuse an attachment
/// before the entry is created.
fn read_pdf(path: &Path) -> Result<(String, Bytes)> {
    let metadata =
        std::fs::metadata(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if metadata.len() > MAX_ATTACHMENT_SIZE as u64 {
        anyhow::bail!("File is too large (max 2MB)");
    }

    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if !is_pdf(&data) {
        anyhow::bail!("Only PDF files are allowed");
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok((name, Bytes::from(data)))
}

async fn upload_pdf(
    client: &BackendClient,
    entry_id: &str,
    name: String,
    data: Bytes,
) -> Result<EntryFile> {
    let progress = spinner(&format!("Uploading {}...", name));
    let result = AttachmentManager::new(client).upload(entry_id, &name, data).await;
    progress.finish_and_clear();

    let file = result?;
    if file.file_name != name {
        println!(
            "{} stored as {}",
            name.yellow(),
            file.file_name.cyan()
        );
    }
    Ok(file)
}

fn print_entry(entry: &Entry, file: Option<&EntryFile>) {
    println!("{}", entry.title.green().bold());
    println!("{}", display_date(&entry.created_at).dimmed());
    println!("{}", format!("id: {}", entry.id).dimmed());
    println!();
    println!("{}", entry.content);
    println!();
    match file {
        Some(file) => {
            println!("{} {}", "Attachment:".bold(), file.file_name);
            println!("  {}", file.file_url.cyan());
            println!("  (link valid for 1 hour)");
        }
        None => println!("{}", "No attachment.".dimmed()),
    }
}

/// Handle the `configure` command
pub fn configure(url: Option<String>, anon_key: Option<String>) -> Result<()> {
    let mut config = Config::load_from(&Config::config_path()?)?;

    let url = match url {
        Some(url) => url,
        None => {
            let mut input = Input::<String>::new().with_prompt("Backend URL");
            if let Some(current) = &config.url {
                input = input.default(current.clone());
            }
            input.interact_text().context("Failed to read URL")?
        }
    };

    let anon_key = match anon_key {
        Some(key) => key,
        None => {
            let mut input = Input::<String>::new().with_prompt("Anon key");
            if let Some(current) = &config.anon_key {
                input = input.default(current.clone()).show_default(false);
            }
            input.interact_text().context("Failed to read anon key")?
        }
    };

    config.url = Some(normalize_url(&url)?);
    config.anon_key = Some(anon_key.trim().to_string());
    let path = config.save()?;

    println!("{}", "Backend configured.".green().bold());
    println!("  URL: {}", config.url.as_deref().unwrap_or_default());
    println!("  Saved to {}", path.display());

    Ok(())
}

/// Handle the `signup` command
pub async fn signup(email: Option<String>, password: Option<String>) -> Result<()> {
    let settings = settings()?;
    let (email, password) = SessionManager::prompt_credentials(email, password, true)?;
    let client = BackendClient::new(&settings.url, &settings.anon_key)?;

    match SessionManager::sign_up(&client, &email, &password).await? {
        SignUpOutcome::SignedIn(session) => {
            println!("{}", "Account created!".green().bold());
            println!(
                "  Signed in as {}",
                session.user.email.as_deref().unwrap_or(&email)
            );
        }
        SignUpOutcome::ConfirmationRequired(_) => {
            println!("{}", "Account created!".green().bold());
            println!("Check {} for a confirmation link, then run {}.", email, "journal login".cyan());
        }
    }

    Ok(())
}

/// Handle the `login` command
pub async fn login(email: Option<String>, password: Option<String>) -> Result<()> {
    let settings = settings()?;
    let (email, password) = SessionManager::prompt_credentials(email, password, false)?;
    let client = BackendClient::new(&settings.url, &settings.anon_key)?;

    let session = SessionManager::login(&client, &email, &password).await?;

    println!("{}", "Signed in!".green().bold());
    println!("  User: {}", session.user.email.as_deref().unwrap_or(&email));
    println!();
    println!("Session stored securely in system keyring.");

    Ok(())
}

/// Handle the `logout` command
pub async fn logout() -> Result<()> {
    if SessionManager::logout(&settings()?).await? {
        println!("{}", "Signed out successfully.".green());
    } else {
        println!("{}", "Not signed in.".yellow());
    }
    Ok(())
}

/// Handle the `whoami` command
pub async fn whoami() -> Result<()> {
    let client = signed_in_client().await?;
    let user = client
        .get_user()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    println!("{}", user.email.as_deref().unwrap_or("(no email)").green().bold());
    println!("  Id: {}", user.id);
    if let Some(created_at) = user.created_at {
        println!("  Member since: {}", display_date(&created_at));
    }

    Ok(())
}

/// Handle the `list` command
pub async fn list(json: bool) -> Result<()> {
    let client = signed_in_client().await?;
    let entries = client
        .list_entries()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to fetch entries")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No entries yet.".yellow());
        println!("Run {} to write your first one.", "journal new".cyan());
        return Ok(());
    }

    println!(
        "{} {}",
        entries.len(),
        if entries.len() == 1 { "entry" } else { "entries" }
    );
    println!();
    for entry in &entries {
        println!(
            "{}  {}",
            display_date(&entry.created_at).dimmed(),
            entry.title.green().bold()
        );
        println!("  {}", preview(&entry.content, 72));
        println!("  {}", entry.id.dimmed());
    }

    Ok(())
}

/// Handle the `show` command
pub async fn show(id: String, json: bool) -> Result<()> {
    let client = signed_in_client().await?;
    let entry = client
        .get_entry(&id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to fetch entry")?;

    let file = AttachmentManager::new(&client).signed_url(&id).await?;

    if json {
        let value = serde_json::json!({ "entry": entry, "file": file });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_entry(&entry, file.as_ref());
    Ok(())
}

/// Handle the `new` command
pub async fn new_entry(
    title: Option<String>,
    content: ContentArgs,
    attach: Option<PathBuf>,
) -> Result<()> {
    let (client, session) = SessionManager::client(&settings()?).await?;

    // Fail before creating anything if the attachment would be rejected
    let attachment = attach.as_deref().map(read_pdf).transpose()?;

    let title = match title {
        Some(title) => title,
        None => Input::new()
            .with_prompt("Title")
            .interact_text()
            .context("Failed to read title")?,
    };
    let content = read_content(content, None)?.unwrap_or_default();
    let draft = EntryDraft::new(&title, &content)?;

    let entry = client
        .create_entry(&session.user.id, &draft.title, &draft.content)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to create entry")?;

    println!("{} {}", "Created".green().bold(), entry.title);
    println!("  Id: {}", entry.id);

    if let Some((name, data)) = attachment {
        match upload_pdf(&client, &entry.id, name, data).await {
            Ok(file) => println!("  Attached {}", file.file_name),
            Err(e) => {
                println!("{} {:#}", "Attachment failed:".red().bold(), e);
                println!(
                    "The entry was saved. Retry with {}.",
                    format!("journal attach {} <PDF>", entry.id).cyan()
                );
            }
        }
    }

    Ok(())
}

/// Handle the `edit` command
pub async fn edit(id: String, title: Option<String>, content: ContentArgs) -> Result<()> {
    let client = signed_in_client().await?;
    let current = client
        .get_entry(&id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to fetch entry")?;

    let interactive = title.is_none() && content.content.is_none() && content.content_file.is_none();

    let (title, content) = if interactive {
        let title: String = Input::new()
            .with_prompt("Title")
            .default(current.title.clone())
            .interact_text()
            .context("Failed to read title")?;
        let content = Editor::new()
            .extension(".md")
            .edit(&current.content)
            .context("Failed to open editor")?
            .unwrap_or_else(|| current.content.clone());
        (title, content)
    } else {
        let content = read_content(content, Some(&current.content))?
            .unwrap_or_else(|| current.content.clone());
        (title.unwrap_or_else(|| current.title.clone()), content)
    };

    let draft = EntryDraft::new(&title, &content)?;
    if draft.title == current.title && draft.content == current.content {
        println!("{}", "No changes.".yellow());
        return Ok(());
    }

    let entry = client
        .update_entry(&id, &draft.title, &draft.content)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to update entry")?;

    println!("{} {}", "Updated".green().bold(), entry.title);
    Ok(())
}

/// Handle the `delete` command
pub async fn delete(id: String, yes: bool) -> Result<()> {
    let client = signed_in_client().await?;
    let entry = client
        .get_entry(&id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to fetch entry")?;

    if !yes && !confirm(&format!("Delete \"{}\"? This cannot be undone", entry.title))? {
        println!("Cancelled.");
        return Ok(());
    }

    entries::delete_entry(&client, &id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Failed to delete entry")?;

    println!("{} {}", "Deleted".green().bold(), entry.title);
    Ok(())
}

/// Handle the `attach` command
pub async fn attach(id: String, file: PathBuf) -> Result<()> {
    let client = signed_in_client().await?;
    let (name, data) = read_pdf(&file)?;
    let file = upload_pdf(&client, &id, name, data).await?;

    println!("{} {}", "Attached".green().bold(), file.file_name);
    println!("  {}", file.file_url.cyan());
    Ok(())
}

/// Handle the `detach` command
pub async fn detach(id: String, yes: bool) -> Result<()> {
    let client = signed_in_client().await?;

    if !yes && !confirm("Are you sure you want to delete this PDF?")? {
        println!("Cancelled.");
        return Ok(());
    }

    AttachmentManager::new(&client).remove(&id).await?;
    println!("{}", "Attachment deleted.".green());
    Ok(())
}

/// Handle the `download` command
pub async fn download(id: String, out: PathBuf, force: bool) -> Result<()> {
    let client = signed_in_client().await?;

    let Some(file) = AttachmentManager::new(&client).signed_url(&id).await? else {
        println!("{}", "This entry has no attachment.".yellow());
        return Ok(());
    };

    let path = export::download_attachment(&client, &id, &file, &out, force).await?;
    println!("{} {}", "Saved".green().bold(), path.display());
    Ok(())
}

/// Handle the `sanitize` command
pub fn sanitize(names: Vec<String>, json: bool) -> Result<()> {
    let results: Vec<_> = names.iter().map(|name| sanitize_filename(name)).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (name, result) in names.iter().zip(&results) {
            if result.is_valid {
                let note = if result.was_modified { " (modified)" } else { "" };
                println!("{} {:?} -> {}{}", "ok".green(), name, result.filename, note.yellow());
            } else {
                println!(
                    "{} {:?}: {}",
                    "rejected".red(),
                    name,
                    result.error.as_deref().unwrap_or_default()
                );
            }
        }
    }

    if results.iter().any(|r| !r.is_valid) {
        anyhow::bail!("Some filenames were rejected");
    }
    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = <super::Cli as clap::CommandFactory>::command();
    generate(shell, &mut cmd, "journal", &mut io::stdout());
}
