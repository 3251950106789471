//! Parser — DSL text to script IR.
//!
//! The grammar is line-oriented and indentation-sensitive. Recognized forms:
//!
//! ```text
//! @trigger <event>
//! @commands
//! @if <left> <op> <right>
//! then [<cmd>]
//! elseif <left> <op> <right> [then <cmd>]
//! else [<cmd>]
//! @timer <duration> [<tick>] [<name>]
//! /<command line>
//! ```
//!
//! A line's nesting is decided by comparing its indentation to the line that
//! opened its enclosing block; a new `@trigger` implicitly closes the
//! previous one. Malformed or out-of-context lines are silently skipped —
//! diagnostics are the validator collaborator's job, and that collaborator
//! never influences the tree built here.

use crate::script::{Action, Condition, Script, TriggerBlock};

/// Parse DSL text into a [`Script`].
///
/// Never fails: unparseable lines are dropped and the rest of the document
/// is still assembled.
#[must_use]
pub fn parse(text: &str) -> Script {
    let lines = scan(text);
    let mut triggers = Vec::new();
    let mut pos = 0;

    while pos < lines.len() {
        if let LineKind::Trigger(event) = &lines[pos].kind {
            let trigger_indent = lines[pos].indent;
            pos += 1;
            let actions = parse_actions(&lines, &mut pos, trigger_indent);
            triggers.push(TriggerBlock {
                event: event.to_string(),
                actions,
            });
        } else {
            // Out of context before/between triggers.
            pos += 1;
        }
    }

    Script::new(triggers)
}

// ─── Line scanning ────────────────────────────────────────────────

struct Line<'a> {
    indent: usize,
    kind: LineKind<'a>,
}

enum LineKind<'a> {
    Trigger(&'a str),
    Commands,
    If(&'a str),
    ElseIf {
        condition: &'a str,
        command: Option<&'a str>,
    },
    ThenCommand(&'a str),
    ThenMarker,
    ElseCommand(&'a str),
    ElseMarker,
    Timer {
        duration: u64,
        tick: u64,
        name: String,
    },
    Command(&'a str),
    Other,
}

fn scan(text: &str) -> Vec<Line<'_>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Line {
            indent: indent_width(line),
            kind: classify(line.trim()),
        })
        .collect()
}

/// Leading whitespace width; tabs count as one 4-space level.
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn classify(line: &str) -> LineKind<'_> {
    if let Some(rest) = line.strip_prefix("@trigger ") {
        return match rest.split_whitespace().next() {
            Some(event) => LineKind::Trigger(event),
            None => LineKind::Other,
        };
    }
    if line == "@commands" || line.starts_with("@commands ") {
        return LineKind::Commands;
    }
    if let Some(rest) = line.strip_prefix("@if ") {
        let rest = rest.trim();
        if rest.is_empty() {
            return LineKind::Other;
        }
        return LineKind::If(rest);
    }
    if let Some(rest) = line.strip_prefix("@timer ") {
        return classify_timer(rest.trim());
    }
    if let Some(rest) = line.strip_prefix("elseif ") {
        return classify_elseif(rest.trim());
    }
    if line == "then" {
        return LineKind::ThenMarker;
    }
    if let Some(rest) = line.strip_prefix("then ") {
        let rest = rest.trim();
        if rest.starts_with('/') {
            return LineKind::ThenCommand(rest);
        }
        return LineKind::Other;
    }
    if line == "else" {
        return LineKind::ElseMarker;
    }
    if let Some(rest) = line.strip_prefix("else ") {
        let rest = rest.trim();
        if rest.starts_with('/') {
            return LineKind::ElseCommand(rest);
        }
        return LineKind::Other;
    }
    if line.starts_with('/') {
        return LineKind::Command(line);
    }
    LineKind::Other
}

/// `@timer <duration> [<tick>] [<name>]` — a second integer token is the
/// tick, everything after it the name. `@timer 5000` keeps the defaults.
fn classify_timer(rest: &str) -> LineKind<'_> {
    let mut tokens = rest.split_whitespace();
    let Some(duration) = tokens.next().and_then(|t| t.parse::<u64>().ok()) else {
        return LineKind::Other;
    };

    let remainder: Vec<&str> = tokens.collect();
    let (tick, name_tokens) = match remainder.first().and_then(|t| t.parse::<u64>().ok()) {
        Some(tick) => (tick, &remainder[1..]),
        None => (1, &remainder[..]),
    };
    let name = if name_tokens.is_empty() {
        "Timer".to_string()
    } else {
        name_tokens.join(" ")
    };

    LineKind::Timer {
        duration,
        tick,
        name,
    }
}

/// `elseif <condition> [then <cmd>]` — the optional inline command starts
/// at the first ` then /`.
fn classify_elseif(rest: &str) -> LineKind<'_> {
    if let Some(idx) = rest.find(" then ") {
        let command = rest[idx + " then ".len()..].trim();
        if command.starts_with('/') {
            return LineKind::ElseIf {
                condition: rest[..idx].trim(),
                command: Some(command),
            };
        }
    }
    LineKind::ElseIf {
        condition: rest,
        command: None,
    }
}

// ─── Tree assembly ────────────────────────────────────────────────

/// Consume every line nested deeper than `parent_indent` and build the
/// action list for that container.
fn parse_actions(lines: &[Line<'_>], pos: &mut usize, parent_indent: usize) -> Vec<Action> {
    let mut actions = Vec::new();
    // The single open `@commands` accumulator; closed by any block keyword.
    let mut open_commands: Option<Vec<String>> = None;

    while *pos < lines.len() {
        let line = &lines[*pos];
        if line.indent <= parent_indent || matches!(line.kind, LineKind::Trigger(_)) {
            break;
        }
        match &line.kind {
            LineKind::Commands => {
                flush_commands(&mut actions, &mut open_commands);
                open_commands = Some(Vec::new());
                *pos += 1;
            }
            LineKind::Command(cmd) => {
                if let Some(values) = open_commands.as_mut() {
                    values.push((*cmd).to_string());
                }
                // Without an open @commands context the line is skipped.
                *pos += 1;
            }
            LineKind::If(condition) => {
                let if_indent = line.indent;
                *pos += 1;
                match condition.parse::<Condition>() {
                    Ok(condition) => {
                        flush_commands(&mut actions, &mut open_commands);
                        actions.push(parse_conditional(condition, None, lines, pos, if_indent));
                    }
                    Err(_) => skip_block(lines, pos, if_indent),
                }
            }
            LineKind::Timer {
                duration,
                tick,
                name,
            } => {
                flush_commands(&mut actions, &mut open_commands);
                let (duration, tick, name) = (*duration, *tick, name.clone());
                let timer_indent = line.indent;
                *pos += 1;
                let commands = parse_timer_body(lines, pos, timer_indent);
                actions.push(Action::Timer {
                    name,
                    duration,
                    tick,
                    commands,
                });
            }
            // Branch lines outside an @if context are skipped.
            LineKind::ThenCommand(_)
            | LineKind::ThenMarker
            | LineKind::ElseCommand(_)
            | LineKind::ElseMarker
            | LineKind::ElseIf { .. }
            | LineKind::Other => *pos += 1,
            LineKind::Trigger(_) => break,
        }
    }

    flush_commands(&mut actions, &mut open_commands);
    actions
}

#[derive(Clone, Copy, PartialEq)]
enum Branch {
    Then,
    Else,
}

/// Assemble one conditional from the lines nested deeper than `if_indent`.
///
/// An `elseif` closes the current conditional and chains a fresh one inside
/// its else branch; the remaining lines of the chain attach to the new
/// context, so the full chain survives in the two-branch tree.
fn parse_conditional(
    condition: Condition,
    inline_then: Option<&str>,
    lines: &[Line<'_>],
    pos: &mut usize,
    if_indent: usize,
) -> Action {
    let mut then_actions: Vec<Action> = Vec::new();
    let mut else_actions: Vec<Action> = Vec::new();
    let mut then_commands: Vec<String> = inline_then.map(ToString::to_string).into_iter().collect();
    let mut else_commands: Vec<String> = Vec::new();
    let mut branch = Branch::Then;

    while *pos < lines.len() {
        let line = &lines[*pos];
        if line.indent <= if_indent || matches!(line.kind, LineKind::Trigger(_)) {
            break;
        }
        match &line.kind {
            LineKind::ThenCommand(cmd) => {
                then_commands.push((*cmd).to_string());
                *pos += 1;
            }
            LineKind::ElseCommand(cmd) => {
                else_commands.push((*cmd).to_string());
                *pos += 1;
            }
            LineKind::ThenMarker => {
                branch = Branch::Then;
                let marker_indent = line.indent;
                *pos += 1;
                flush_commands(&mut then_actions, &mut Some(std::mem::take(&mut then_commands)));
                then_actions.extend(parse_actions(lines, pos, marker_indent));
            }
            LineKind::ElseMarker => {
                branch = Branch::Else;
                let marker_indent = line.indent;
                *pos += 1;
                flush_commands(&mut else_actions, &mut Some(std::mem::take(&mut else_commands)));
                else_actions.extend(parse_actions(lines, pos, marker_indent));
            }
            LineKind::ElseIf {
                condition: chained,
                command,
            } => {
                let chained = chained.parse::<Condition>();
                let command = *command;
                *pos += 1;
                match chained {
                    Ok(chained) => {
                        flush_commands(
                            &mut then_actions,
                            &mut Some(std::mem::take(&mut then_commands)),
                        );
                        flush_commands(
                            &mut else_actions,
                            &mut Some(std::mem::take(&mut else_commands)),
                        );
                        else_actions.push(parse_conditional(chained, command, lines, pos, if_indent));
                        break;
                    }
                    Err(_) => {
                        // Malformed chain link: skipped, chain continues here.
                    }
                }
            }
            LineKind::Command(cmd) => {
                // A bare command inside an @if attaches to the active branch.
                match branch {
                    Branch::Then => then_commands.push((*cmd).to_string()),
                    Branch::Else => else_commands.push((*cmd).to_string()),
                }
                *pos += 1;
            }
            LineKind::If(nested) => {
                let nested_indent = line.indent;
                let nested = nested.parse::<Condition>();
                *pos += 1;
                match nested {
                    Ok(nested) => {
                        let action = parse_conditional(nested, None, lines, pos, nested_indent);
                        push_to_branch(branch, action, &mut then_actions, &mut else_actions,
                            &mut then_commands, &mut else_commands);
                    }
                    Err(_) => skip_block(lines, pos, nested_indent),
                }
            }
            LineKind::Timer {
                duration,
                tick,
                name,
            } => {
                let (duration, tick, name) = (*duration, *tick, name.clone());
                let timer_indent = line.indent;
                *pos += 1;
                let commands = parse_timer_body(lines, pos, timer_indent);
                let action = Action::Timer {
                    name,
                    duration,
                    tick,
                    commands,
                };
                push_to_branch(branch, action, &mut then_actions, &mut else_actions,
                    &mut then_commands, &mut else_commands);
            }
            LineKind::Commands => {
                // An explicit @commands block inside a branch.
                let commands_indent = line.indent;
                *pos += 1;
                let mut values = Vec::new();
                while *pos < lines.len() && lines[*pos].indent > commands_indent {
                    if let LineKind::Command(cmd) = &lines[*pos].kind {
                        values.push((*cmd).to_string());
                    }
                    *pos += 1;
                }
                if !values.is_empty() {
                    push_to_branch(branch, Action::Command { values },
                        &mut then_actions, &mut else_actions,
                        &mut then_commands, &mut else_commands);
                }
            }
            LineKind::Other => *pos += 1,
            LineKind::Trigger(_) => break,
        }
    }

    flush_commands(&mut then_actions, &mut Some(then_commands));
    flush_commands(&mut else_actions, &mut Some(else_commands));
    Action::IfThenElse {
        condition,
        then: then_actions,
        otherwise: else_actions,
    }
}

/// Append `action` to the active branch, flushing that branch's pending
/// command values first so in-branch line order is preserved.
fn push_to_branch(
    branch: Branch,
    action: Action,
    then_actions: &mut Vec<Action>,
    else_actions: &mut Vec<Action>,
    then_commands: &mut Vec<String>,
    else_commands: &mut Vec<String>,
) {
    match branch {
        Branch::Then => {
            flush_commands(then_actions, &mut Some(std::mem::take(then_commands)));
            then_actions.push(action);
        }
        Branch::Else => {
            flush_commands(else_actions, &mut Some(std::mem::take(else_commands)));
            else_actions.push(action);
        }
    }
}

/// A timer body is command lines only; anything else nested under the
/// timer is out of context and dropped.
fn parse_timer_body(lines: &[Line<'_>], pos: &mut usize, timer_indent: usize) -> Vec<String> {
    let mut commands = Vec::new();
    while *pos < lines.len() {
        let line = &lines[*pos];
        if line.indent <= timer_indent || matches!(line.kind, LineKind::Trigger(_)) {
            break;
        }
        if let LineKind::Command(cmd) = &line.kind {
            commands.push((*cmd).to_string());
        }
        *pos += 1;
    }
    commands
}

fn flush_commands(actions: &mut Vec<Action>, open: &mut Option<Vec<String>>) {
    if let Some(values) = open.take() {
        if !values.is_empty() {
            actions.push(Action::Command { values });
        }
    }
}

/// Skip a malformed block line's body so its children don't attach to the
/// wrong context.
fn skip_block(lines: &[Line<'_>], pos: &mut usize, block_indent: usize) {
    while *pos < lines.len()
        && lines[*pos].indent > block_indent
        && !matches!(lines[*pos].kind, LineKind::Trigger(_))
    {
        *pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Operator;

    fn command(values: &[&str]) -> Action {
        Action::Command {
            values: values.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn should_parse_the_reference_script() {
        let text = "\
@trigger PlayerJoined
    @commands
        /chat Hi
        /give sword 1
    @if player.health == 100
        then /chat full
    @timer 5000
        /chat tick
";
        let script = parse(text);
        assert_eq!(script.triggers.len(), 1);

        let trigger = &script.triggers[0];
        assert_eq!(trigger.event, "PlayerJoined");
        assert_eq!(trigger.actions.len(), 3);
        assert_eq!(trigger.actions[0], command(&["/chat Hi", "/give sword 1"]));
        assert_eq!(
            trigger.actions[1],
            Action::IfThenElse {
                condition: Condition::new("player.health", Operator::Eq, "100"),
                then: vec![command(&["/chat full"])],
                otherwise: vec![],
            }
        );
        assert_eq!(
            trigger.actions[2],
            Action::Timer {
                name: "Timer".to_string(),
                duration: 5000,
                tick: 1,
                commands: vec!["/chat tick".to_string()],
            }
        );
    }

    #[test]
    fn should_close_previous_block_when_new_trigger_starts() {
        let text = "\
@trigger First
    @commands
        /one
@trigger Second
    @commands
        /two
";
        let script = parse(text);
        assert_eq!(script.triggers.len(), 2);
        assert_eq!(script.triggers[0].event, "First");
        assert_eq!(script.triggers[0].actions, vec![command(&["/one"])]);
        assert_eq!(script.triggers[1].actions, vec![command(&["/two"])]);
    }

    #[test]
    fn should_decompose_condition_with_length_descending_operator_scan() {
        let script = parse("@trigger E\n    @if a >= b\n        then /x\n");
        let Action::IfThenElse { condition, .. } = &script.triggers[0].actions[0] else {
            panic!("expected conditional");
        };
        assert_eq!(condition.left, "a");
        assert_eq!(condition.operator, Operator::Ge);
        assert_eq!(condition.right, "b");
    }

    #[test]
    fn should_chain_elseif_into_the_else_branch() {
        let text = "\
@trigger E
    @if hp <= 20
        then /chat low
        elseif hp <= 50 then /chat mid
        else /chat high
";
        let script = parse(text);
        let Action::IfThenElse {
            condition,
            then,
            otherwise,
        } = &script.triggers[0].actions[0]
        else {
            panic!("expected conditional");
        };
        assert_eq!(condition.right, "20");
        assert_eq!(then, &vec![command(&["/chat low"])]);

        assert_eq!(otherwise.len(), 1);
        let Action::IfThenElse {
            condition,
            then,
            otherwise,
        } = &otherwise[0]
        else {
            panic!("expected chained conditional");
        };
        assert_eq!(condition.right, "50");
        assert_eq!(then, &vec![command(&["/chat mid"])]);
        assert_eq!(otherwise, &vec![command(&["/chat high"])]);
    }

    #[test]
    fn should_parse_timer_with_explicit_tick_and_name() {
        let script = parse("@trigger E\n    @timer 5000 2 Heartbeat Check\n        /tick\n");
        assert_eq!(
            script.triggers[0].actions[0],
            Action::Timer {
                name: "Heartbeat Check".to_string(),
                duration: 5000,
                tick: 2,
                commands: vec!["/tick".to_string()],
            }
        );
    }

    #[test]
    fn should_parse_timer_name_without_tick() {
        let script = parse("@trigger E\n    @timer 300 Cooldown\n");
        assert_eq!(
            script.triggers[0].actions[0],
            Action::Timer {
                name: "Cooldown".to_string(),
                duration: 300,
                tick: 1,
                commands: vec![],
            }
        );
    }

    #[test]
    fn should_attach_nested_blocks_to_branch_markers() {
        let text = "\
@trigger E
    @if a == b
        then /first
        then
            @timer 100 1 Inner
                /tick
        else
            @if c != d
                then /deep
";
        let script = parse(text);
        let Action::IfThenElse {
            then, otherwise, ..
        } = &script.triggers[0].actions[0]
        else {
            panic!("expected conditional");
        };

        assert_eq!(then.len(), 2);
        assert_eq!(then[0], command(&["/first"]));
        assert!(matches!(&then[1], Action::Timer { name, .. } if name == "Inner"));

        assert_eq!(otherwise.len(), 1);
        let Action::IfThenElse { condition, then, .. } = &otherwise[0] else {
            panic!("expected nested conditional");
        };
        assert_eq!(condition.operator, Operator::Ne);
        assert_eq!(then, &vec![command(&["/deep"])]);
    }

    #[test]
    fn should_skip_malformed_lines_silently() {
        let text = "\
@trigger E
    garbage here
    @if no operator at all
        then /lost
    @commands
        /kept
";
        let script = parse(text);
        assert_eq!(script.triggers[0].actions, vec![command(&["/kept"])]);
    }

    #[test]
    fn should_skip_the_body_of_a_malformed_timer() {
        let text = "\
@trigger E
    @timer soon
        /orphan
    @commands
        /kept
";
        let script = parse(text);
        assert_eq!(script.triggers[0].actions, vec![command(&["/kept"])]);
    }

    #[test]
    fn should_skip_commands_outside_a_commands_context() {
        let text = "\
@trigger E
    /orphan
    @commands
        /kept
";
        let script = parse(text);
        assert_eq!(script.triggers[0].actions, vec![command(&["/kept"])]);
    }

    #[test]
    fn should_skip_branch_lines_outside_a_conditional() {
        let text = "\
@trigger E
    then /orphan
    else /orphan
";
        let script = parse(text);
        assert!(script.triggers[0].actions.is_empty());
    }

    #[test]
    fn should_start_a_new_command_action_per_commands_keyword() {
        let text = "\
@trigger E
    @commands
        /one
    @commands
        /two
";
        let script = parse(text);
        assert_eq!(
            script.triggers[0].actions,
            vec![command(&["/one"]), command(&["/two"])]
        );
    }

    #[test]
    fn should_ignore_text_before_the_first_trigger() {
        let script = parse("/stray\nwords\n@trigger E\n    @commands\n        /ok\n");
        assert_eq!(script.triggers.len(), 1);
        assert_eq!(script.triggers[0].actions, vec![command(&["/ok"])]);
    }

    #[test]
    fn should_parse_empty_input_to_empty_script() {
        assert_eq!(parse(""), Script::default());
        assert_eq!(parse("\n\n  \n"), Script::default());
    }

    #[test]
    fn should_tolerate_tab_indentation() {
        let script = parse("@trigger E\n\t@commands\n\t\t/tabbed\n");
        assert_eq!(script.triggers[0].actions, vec![command(&["/tabbed"])]);
    }

    #[test]
    fn should_keep_unknown_event_names() {
        let script = parse("@trigger TotallyMadeUp\n");
        assert_eq!(script.triggers[0].event, "TotallyMadeUp");
    }
}
