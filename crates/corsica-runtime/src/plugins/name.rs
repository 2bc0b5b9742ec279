use super::error::PluginError;

/// Checks that `name` is a single package name safe to use as a path segment.
///
/// Accepts plain names (`corsica-chat`) and scoped names (`@corsica/chat`).
/// Rejects anything that could escape the plugin directory or smuggle extra
/// arguments to the package manager.
///
/// # Errors
///
/// Returns [`PluginError::InvalidName`] describing the first problem found.
pub fn validate_plugin_name(name: &str) -> Result<(), PluginError> {
    let invalid = |reason| {
        Err(PluginError::InvalidName {
            name: name.to_owned(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("the name is empty");
    }
    if name.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return invalid("the name contains whitespace or control characters");
    }
    if name.contains('\\') || name.contains("..") {
        return invalid("the name contains a path traversal sequence");
    }
    if name.starts_with('.') || name.starts_with('-') {
        return invalid("the name must not start with '.' or '-'");
    }

    match name.strip_prefix('@') {
        Some(scoped) => match scoped.split_once('/') {
            Some((scope, package))
                if !scope.is_empty() && is_plain_segment(scope) && is_plain_segment(package) =>
            {
                Ok(())
            }
            _ => invalid("scoped names must look like '@scope/name'"),
        },
        None if is_plain_segment(name) => Ok(()),
        None => invalid("the name must be a single package name"),
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && !segment.starts_with('-')
        && !segment.contains(['/', '@'])
}
