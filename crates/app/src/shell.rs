use crate::{open_files, AppSession};
use chrono::{DateTime, Utc};
use docqa_core::{discover_files, ChatEntry, Document, QueryError, QueryOutcome, UploadPolicy};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
commands:
  list                    list documents, newest first
  search <term>           filter documents by title or description
  upload <path>...        upload files (a directory uploads its contents;
                          quote paths that contain spaces)
  select <id>             make a document the query target
  deselect                clear the selection
  delete <id>             remove a document
  show [id]               print extracted text of a document
  ask <question>          ask about the selected document
  history                 show the selected document's chat, newest first
  clear-history           forget the selected document's chat
  help                    show this text
  quit                    leave the shell";

pub(crate) fn print_document(document: &Document, now: DateTime<Utc>) {
    println!(
        "{}  {}  pages={} size={}B  {}",
        document.id,
        document.title,
        document.pages,
        document.file_size,
        document.summary_age(now)
    );
    println!(
        "    {}",
        document
            .description
            .as_deref()
            .unwrap_or("No description available")
    );
}

pub(crate) fn print_pages(document: &Document, max_pages: usize) {
    println!("document: {} ({} page(s))", document.title, document.pages);
    for (index, text) in document.contents.iter().take(max_pages).enumerate() {
        println!("[page {}]\n{}", index + 1, text);
    }
    if document.contents.len() > max_pages {
        println!("... output truncated to first {max_pages} page(s)");
    }
}

pub(crate) fn print_entry(entry: &ChatEntry) {
    println!("Question: {}", entry.query);
    println!("Answer: {}", entry.answer);
    if !entry.sources.is_empty() {
        println!("Sources:");
        for source in &entry.sources {
            println!("  Page {}: \"{}\"", source.page, source.text);
        }
    }
    println!("  ({})", entry.timestamp.to_rfc3339());
}

/// Splits on whitespace, keeping single- or double-quoted runs together.
/// An unterminated quote runs to the end of the line.
fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote = None;

    for ch in input.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_arg = true;
            }
            None if ch.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            None => {
                current.push(ch);
                in_arg = true;
            }
        }
    }

    if in_arg {
        args.push(current);
    }
    args
}

fn prompt() {
    print!("docqa> ");
    let _ = std::io::stdout().flush();
}

pub(crate) async fn run(session: &mut AppSession, policy: UploadPolicy) -> anyhow::Result<()> {
    println!("{HELP}");
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map(|(command, rest)| (command, rest.trim()))
            .unwrap_or((line, ""));

        match command {
            "" => {}
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "list" => list(session, ""),
            "search" => list(session, rest),
            "upload" => upload(session, rest, policy).await,
            "select" => match session.select(rest) {
                Some(document) if document.id == rest => println!("Selected {}", document.title),
                _ => println!("No document with id {rest}"),
            },
            "deselect" => {
                session.clear_selection();
                println!("Selection cleared");
            }
            "delete" => match session.delete(rest) {
                Ok(true) => println!("The document has been removed successfully"),
                Ok(false) => println!("No document with id {rest}"),
                Err(error) => println!("Delete failed: {error}"),
            },
            "show" => {
                let target = if rest.is_empty() {
                    session.selected()
                } else {
                    session.store().get(rest)
                };
                match target {
                    Some(document) => print_pages(document, usize::MAX),
                    None => println!("No document selected"),
                }
            }
            "ask" => ask(session, rest).await,
            "history" => history(session),
            "clear-history" => match session.selected().map(|doc| doc.id.clone()) {
                Some(id) => {
                    session.clear_history(&id);
                    println!("Chat cleared");
                }
                None => println!("No document selected"),
            },
            other => println!("unknown command: {other} (try `help`)"),
        }

        prompt();
    }

    Ok(())
}

fn list(session: &AppSession, term: &str) {
    if session.documents().is_empty() {
        println!("No documents uploaded yet");
        return;
    }

    let found = session.search(term);
    if found.is_empty() {
        println!("No documents match \"{term}\"");
    }
    let now = Utc::now();
    let selected = session.selected().map(|doc| doc.id.as_str());
    for document in found {
        if selected == Some(document.id.as_str()) {
            print!("* ");
        }
        print_document(document, now);
    }
}

async fn upload(session: &mut AppSession, rest: &str, policy: UploadPolicy) {
    let mut paths = Vec::new();
    for raw in split_args(rest) {
        let path = PathBuf::from(raw);
        if path.is_dir() {
            paths.extend(discover_files(&path, policy));
        } else {
            paths.push(path);
        }
    }

    let files = match open_files(&paths).await {
        Ok(files) => files,
        Err(error) => {
            println!("Upload failed: {error:#}");
            return;
        }
    };

    println!("Uploading...");
    match session.upload(files) {
        Ok(documents) => println!("{} file(s) uploaded successfully", documents.len()),
        Err(error) => println!("Upload failed: {error}"),
    }
}

async fn ask(session: &mut AppSession, question: &str) {
    println!("Processing...");
    match session.ask(question).await {
        Ok(QueryOutcome::Recorded { entry, .. }) => print_entry(&entry),
        Ok(QueryOutcome::Discarded { document_id }) => {
            debug!(%document_id, "answer discarded");
            println!("Document was removed before the answer arrived");
        }
        Err(QueryError::NoDocumentSelected) => {
            println!("No document selected: select a document to start querying")
        }
        Err(QueryError::EmptyQuery) => println!("Type a question after `ask`"),
        Err(error) => println!("Failed to get an answer: {error}"),
    }
}

fn history(session: &AppSession) {
    let Some(document) = session.selected() else {
        println!("No document selected");
        return;
    };

    let entries = session.history().newest_first(&document.id).collect::<Vec<_>>();
    if entries.is_empty() {
        println!("No queries yet. Ask a question to get started.");
        return;
    }

    for (index, entry) in entries.iter().enumerate() {
        print_entry(entry);
        if index + 1 < entries.len() {
            println!("- - -");
        }
    }
}
