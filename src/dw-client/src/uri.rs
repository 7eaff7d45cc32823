use dw_types::options::ListOptions;
use dw_types::{Crd, Spec};

use crate::http::Uri;
use crate::ClientError;
use crate::NameSpace;

/// uri of a single item, with optional sub resource such as `/status`
pub fn item_uri<S>(
    host: &str,
    name: &str,
    namespace: &str,
    sub_resource: Option<&str>,
) -> Result<Uri, ClientError>
where
    S: Spec,
{
    let ns = if S::NAME_SPACED {
        NameSpace::Named(namespace.to_owned())
    } else {
        NameSpace::All
    };

    let prefix = prefix_uri(S::metadata(), host, ns, None)?;
    let sub_resource = sub_resource.unwrap_or("");

    Ok(format!("{prefix}/{name}{sub_resource}").parse()?)
}

/// uri of a collection
pub fn items_uri<S>(
    host: &str,
    namespace: NameSpace,
    list_options: Option<ListOptions>,
) -> Result<Uri, ClientError>
where
    S: Spec,
{
    let ns = if S::NAME_SPACED {
        namespace
    } else {
        NameSpace::All
    };
    let uri_value = prefix_uri(S::metadata(), host, ns, list_options)?;
    Ok(uri_value.parse()?)
}

/// generate prefix for given crd
/// if crd group is core then /api is used otherwise /apis + group
pub fn prefix_uri<N>(
    crd: &Crd,
    host: &str,
    ns: N,
    options: Option<ListOptions>,
) -> Result<String, ClientError>
where
    N: Into<NameSpace>,
{
    let namespace = ns.into();
    let version = crd.version;
    let plural = crd.names.plural;
    let api_prefix = match crd.group {
        "core" => "api".to_owned(),
        group => format!("apis/{group}"),
    };

    let query = match options {
        Some(opt) => {
            let qs = serde_qs::to_string(&opt)
                .map_err(|err| ClientError::Other(format!("list options: {err}")))?;
            format!("?{qs}")
        }
        None => "".to_owned(),
    };

    if namespace.is_all() {
        Ok(format!("{host}/{api_prefix}/{version}/{plural}{query}"))
    } else {
        Ok(format!(
            "{host}/{api_prefix}/{version}/namespaces/{}/{plural}{query}",
            namespace.named()
        ))
    }
}

#[cfg(test)]
mod test {
    use dw_types::devworkspace::DevWorkspaceSpec;
    use dw_types::event::EventSpec;
    use dw_types::{Crd, CrdNames, DEFAULT_NS};

    use super::ListOptions;
    use super::{item_uri, items_uri, prefix_uri};
    use crate::NameSpace;

    const C1: Crd = Crd {
        group: "core",
        version: "v1",
        names: CrdNames {
            kind: "Item",
            plural: "items",
            singular: "item",
        },
    };

    #[test]
    fn test_api_prefix_group() {
        let uri = items_uri::<DevWorkspaceSpec>("https://localhost", "user-che".into(), None)
            .expect("uri");
        assert_eq!(
            uri.to_string(),
            "https://localhost/apis/workspace.devfile.io/v1alpha2/namespaces/user-che/devworkspaces"
        );
    }

    #[test]
    fn test_api_prefix_core() {
        let uri = prefix_uri(&C1, "https://localhost", DEFAULT_NS, None).expect("uri");
        assert_eq!(uri, "https://localhost/api/v1/namespaces/default/items");

        let uri = prefix_uri(&C1, "https://localhost", NameSpace::All, None).expect("uri");
        assert_eq!(uri, "https://localhost/api/v1/items");
    }

    #[test]
    fn test_api_prefix_watch() {
        let opt = ListOptions {
            watch: Some(true),
            resource_version: Some("7719".to_owned()),
            ..Default::default()
        };
        let uri = items_uri::<EventSpec>("https://localhost", "user-che".into(), Some(opt))
            .expect("uri");
        assert_eq!(
            uri.to_string(),
            "https://localhost/api/v1/namespaces/user-che/events?resourceVersion=7719&watch=true"
        );
    }

    #[test]
    fn test_item_uri() {
        let uri = item_uri::<DevWorkspaceSpec>(
            "http://localhost:8001",
            "nodejs-web-app",
            "user-che",
            Some("/status"),
        )
        .expect("uri");
        assert_eq!(
            uri.to_string(),
            "http://localhost:8001/apis/workspace.devfile.io/v1alpha2/namespaces/user-che/devworkspaces/nodejs-web-app/status"
        );
    }
}
