//! Thread commands that complete within a single request/reply

use tracing::info;

use crate::error::BoardError;
use crate::store::{check_title, ThreadStore};

/// `CRT`
pub(crate) async fn create(
    store: &ThreadStore,
    identity: &str,
    title: &str,
) -> Result<String, BoardError> {
    check_title(title)?;
    let _ = store.create(title, identity).await?;
    info!("{identity} created thread {title}");
    Ok(format!("Thread {title} created."))
}

/// `MSG`
pub(crate) async fn post(
    store: &ThreadStore,
    identity: &str,
    title: &str,
    text: &str,
) -> Result<String, BoardError> {
    check_title(title)?;
    // Appending needs the next number, which only the parsed record knows
    let mut thread = store.load(title).await?;
    let entry = thread.post(identity, text);
    store.append(title, entry).await?;
    info!("{identity} posted to {title}");
    Ok(format!("Message posted to thread {title}."))
}

/// `DLT`
pub(crate) async fn delete(
    store: &ThreadStore,
    identity: &str,
    title: &str,
    number: i64,
) -> Result<String, BoardError> {
    check_title(title)?;
    let mut thread = store.load(title).await?;
    let removed = thread.delete(number, identity)?;
    store.save(&thread).await?;
    info!("{identity} deleted message {} from {title}", removed.number);
    Ok(format!("Message {number} deleted from thread '{title}'."))
}

/// `EDT`
pub(crate) async fn edit(
    store: &ThreadStore,
    identity: &str,
    title: &str,
    number: i64,
    text: &str,
) -> Result<String, BoardError> {
    check_title(title)?;
    let mut thread = store.load(title).await?;
    let _ = thread.edit(number, identity, text)?;
    store.save(&thread).await?;
    info!("{identity} edited message {number} in {title}");
    Ok(format!("Message {number} edited successfully."))
}

/// `LST`
pub(crate) async fn list(store: &ThreadStore) -> Result<String, BoardError> {
    let titles = store.list().await?;
    if titles.is_empty() {
        return Ok("No threads exist.".into());
    }
    Ok(format!("current threads:\n{}", titles.join("\n")))
}

/// `RDT`
pub(crate) async fn read(store: &ThreadStore, title: &str) -> Result<String, BoardError> {
    check_title(title)?;
    Ok(store.load(title).await?.render())
}

/// `RMV`
pub(crate) async fn remove(
    store: &ThreadStore,
    identity: &str,
    title: &str,
) -> Result<String, BoardError> {
    check_title(title)?;
    let thread = store.load(title).await?;
    if thread.creator() != identity {
        return Err(BoardError::NotCreator);
    }
    let attachments = store.remove(title).await?;
    info!("{identity} removed thread {title} and {attachments} attachment(s)");
    Ok(format!(
        "Thread '{title}' and its associated files have been removed."
    ))
}
