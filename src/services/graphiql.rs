//! Renders the interactive GraphiQL page with the request and result baked in.

use crate::graphql;
use crate::json_ext::Object;

/// Render the page. The query, variables, operation name, and result are
/// interpolated into the inline script so the editor opens pre-populated.
pub(crate) fn render_graphiql(
    query: Option<&str>,
    variables: Option<&Object>,
    operation_name: Option<&str>,
    result: Option<&graphql::Response>,
) -> String {
    const TEMPLATE: &str = include_str!("../../templates/graphiql.html");

    let variables_string =
        variables.map(|variables| serde_json::to_string_pretty(variables).expect("cannot fail"));
    let result_string =
        result.map(|result| serde_json::to_string_pretty(result).expect("cannot fail"));

    TEMPLATE
        .replace("{{QUERY}}", &safe_serialize(query))
        .replace("{{VARIABLES}}", &safe_serialize(variables_string.as_deref()))
        .replace("{{OPERATION_NAME}}", &safe_serialize(operation_name))
        .replace("{{RESULT}}", &safe_serialize(result_string.as_deref()))
}

// Serialized strings are embedded in a <script> element, so every `/` is
// escaped to `\/` to prevent `</script>` from terminating it early.
fn safe_serialize(data: Option<&str>) -> String {
    match data {
        Some(data) => serde_json::to_string(data)
            .expect("cannot fail")
            .replace('/', "\\/"),
        None => "undefined".to_string(),
    }
}
