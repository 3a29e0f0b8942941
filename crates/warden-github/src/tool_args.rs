use std::collections::HashSet;

const ALLOWED_TOOLS_FLAGS: [&str; 2] = ["--allowedTools", "--allowed-tools"];
const DISALLOWED_TOOLS_FLAGS: [&str; 2] = ["--disallowedTools", "--disallowed-tools"];

/// Extract tool names passed through `--allowedTools` in user-supplied assistant args.
pub fn parse_allowed_tools(args: &str) -> Vec<String> {
    parse_tool_flag_values(args, &ALLOWED_TOOLS_FLAGS)
}

/// Extract tool names passed through `--disallowedTools` in user-supplied assistant args.
pub fn parse_disallowed_tools(args: &str) -> Vec<String> {
    parse_tool_flag_values(args, &DISALLOWED_TOOLS_FLAGS)
}

/// Drop repeated entries, keeping the first occurrence.
pub fn dedupe_preserving_order(tools: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tools
        .into_iter()
        .filter(|tool| seen.insert(tool.clone()))
        .collect()
}

fn parse_tool_flag_values(args: &str, flags: &[&str]) -> Vec<String> {
    let tokens = shell_words::split(args)
        .unwrap_or_else(|_| args.split_whitespace().map(ToOwned::to_owned).collect());
    let mut tools = Vec::new();
    let mut index = 0;
    while index < tokens.len() {
        let token = tokens[index].as_str();
        if let Some((flag, value)) = token.split_once('=') {
            if flags.contains(&flag) {
                tools.extend(split_tool_list(value));
            }
        } else if flags.contains(&token) {
            if let Some(value) = tokens.get(index + 1) {
                tools.extend(split_tool_list(value));
                index += 1;
            }
        }
        index += 1;
    }
    dedupe_preserving_order(tools)
}

fn split_tool_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tool| !tool.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
