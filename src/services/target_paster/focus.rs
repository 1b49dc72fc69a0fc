use crate::error::Result;
use crate::events::WindowInfo;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use tracing::debug;
use zbus::zvariant::OwnedObjectPath;
use zbus::Connection;

/// Роли AT-SPI, в которые имеет смысл вставлять (константы платформенной
/// границы, не предмет обобщения)
static TEXT_LIKE_ROLES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "text",
        "entry",
        "paragraph",
        "password text",
        "search box",
        "document web",
        "document text",
        "combo box",
        "terminal",
        "editbar",
    ]
    .into_iter()
    .collect()
});

/// Бит состояния FOCUSED в первом слове GetState (AT-SPI константа)
const FOCUSED_STATE_BIT: u32 = 1 << 12;

/// Предел обхода дерева доступности за одну проверку
const WALK_LIMIT: usize = 256;

pub fn is_text_like_role(role: &str) -> bool {
    TEXT_LIKE_ROLES.contains(role.to_lowercase().trim())
}

#[zbus::proxy(
    interface = "org.a11y.Bus",
    default_service = "org.a11y.Bus",
    default_path = "/org/a11y/bus"
)]
trait A11yBus {
    fn get_address(&self) -> zbus::Result<String>;
}

#[zbus::proxy(interface = "org.a11y.atspi.Accessible")]
trait Accessible {
    fn get_child_at_index(&self, index: i32) -> zbus::Result<(String, OwnedObjectPath)>;
    fn get_role_name(&self) -> zbus::Result<String>;
    fn get_state(&self) -> zbus::Result<Vec<u32>>;

    #[zbus(property)]
    fn child_count(&self) -> zbus::Result<i32>;

    #[zbus(property)]
    fn name(&self) -> zbus::Result<String>;
}

/// Роль сфокусированного элемента внутри целевого приложения.
/// None - дерево доступности недоступно либо фокус не найден; для
/// верификации это трактуется как best-effort "не опровергнуто".
pub async fn focused_role(target: &WindowInfo) -> Result<Option<String>> {
    let session = Connection::session().await?;
    let address = A11yBusProxy::new(&session).await?.get_address().await?;

    let a11y = zbus::connection::Builder::address(address.as_str())?
        .build()
        .await?;

    let root = AccessibleProxy::builder(&a11y)
        .destination("org.a11y.atspi.Registry")?
        .path("/org/a11y/atspi/accessible/root")?
        .build()
        .await?;

    // Дети корня - приложения; ищем целевое по имени/классу
    let app_count = root.child_count().await.unwrap_or(0);
    for index in 0..app_count {
        let (service, path) = match root.get_child_at_index(index).await {
            Ok(child) => child,
            Err(_) => continue,
        };

        let app = match AccessibleProxy::builder(&a11y)
            .destination(service.clone())
            .and_then(|b| b.path(path))
            .map(|b| b.build())
        {
            Ok(build) => match build.await {
                Ok(app) => app,
                Err(_) => continue,
            },
            Err(_) => continue,
        };

        let app_name = app.name().await.unwrap_or_default();
        let matches = !app_name.is_empty()
            && ((!target.class.is_empty()
                && app_name.to_lowercase().contains(&target.class.to_lowercase()))
                || target.matches_pattern(&app_name));
        if !matches {
            continue;
        }

        debug!("Ищем фокус в дереве доступности приложения '{}'", app_name);
        if let Some(role) = find_focused_role(&a11y, &app).await {
            return Ok(Some(role));
        }
    }

    Ok(None)
}

/// Ограниченный обход в ширину в поисках узла с состоянием FOCUSED
async fn find_focused_role(
    connection: &Connection,
    app: &AccessibleProxy<'_>,
) -> Option<String> {
    let mut queue: Vec<(String, OwnedObjectPath)> = Vec::new();

    let child_count = app.child_count().await.unwrap_or(0);
    for index in 0..child_count {
        if let Ok(child) = app.get_child_at_index(index).await {
            queue.push(child);
        }
    }

    let mut visited = 0usize;
    while let Some((service, path)) = queue.pop() {
        visited += 1;
        if visited > WALK_LIMIT {
            debug!("Предел обхода дерева доступности достигнут");
            return None;
        }

        let node = match AccessibleProxy::builder(connection)
            .destination(service)
            .and_then(|b| b.path(path))
            .map(|b| b.build())
        {
            Ok(build) => match build.await {
                Ok(node) => node,
                Err(_) => continue,
            },
            Err(_) => continue,
        };

        if let Ok(state) = node.get_state().await {
            if state.first().map(|w| w & FOCUSED_STATE_BIT != 0).unwrap_or(false) {
                return node.get_role_name().await.ok();
            }
        }

        let child_count = node.child_count().await.unwrap_or(0);
        for index in 0..child_count {
            if let Ok(child) = node.get_child_at_index(index).await {
                queue.push(child);
            }
        }
    }

    None
}
