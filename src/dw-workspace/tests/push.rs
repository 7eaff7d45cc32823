use futures_util::stream::StreamExt;

use fluvio_future::test_async;

use dw_workspace::LifecycleError;
use dw_workspace::PushMessage;
use dw_workspace::StoreHandle;
use dw_workspace::WorkspaceStatus;

fn frame(ty: &str, version: u32, phase: &str) -> String {
    format!(
        r#"{{"channel":"devWorkspace","message":{{"type":"{ty}","object":{{"metadata":{{"name":"wksp","namespace":"user-che","uid":"u-1","resourceVersion":"{version}"}},"spec":{{"started":true}},"status":{{"phase":"{phase}"}}}}}}}}"#
    )
}

#[test_async]
async fn test_dispatch_frames() -> Result<(), LifecycleError> {
    let store = StoreHandle::spawn();
    let mut changes = store.subscribe()?;

    store.dispatch(PushMessage::decode(&frame("ADDED", 3, "Starting"))?)?;
    store.dispatch(PushMessage::decode(&frame("MODIFIED", 9, "Running"))?)?;
    // late delivery of an older version
    store.dispatch(PushMessage::decode(&frame("MODIFIED", 5, "Failed"))?)?;

    let first = changes.next().await.expect("added");
    assert_eq!(first.previous, None);
    assert_eq!(first.current, WorkspaceStatus::Starting);

    let second = changes.next().await.expect("modified");
    assert_eq!(second.previous, Some(WorkspaceStatus::Starting));
    assert_eq!(second.current, WorkspaceStatus::Running);

    let cached = store.get("u-1").await?.expect("cached");
    assert_eq!(cached.resource_version(), "9");
    assert!(cached.is_running());
    assert!(store.running_limit_exceeded(1).await?);

    store.dispatch(PushMessage::decode(&frame("DELETED", 10, "Running"))?)?;
    let removed = changes.next().await.expect("deleted");
    assert!(removed.removed);
    assert!(store.workspaces().await?.is_empty());

    let event = r#"{"channel":"event","message":{"type":"ADDED","object":{"metadata":{"name":"pod.1","resourceVersion":"11"},"involvedObject":{"uid":"pod-uid"},"reason":"Pulled"}}}"#;
    store.dispatch(PushMessage::decode(event)?)?;
    let events = store.events("pod-uid").await?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].header.reason.as_deref(), Some("Pulled"));

    drop(changes);
    assert_eq!(store.subscriber_count().await?, 0);
    Ok(())
}
