use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::map_draw::tag_color;
use crate::state::AppState;

pub fn draw(f: &mut Frame<'_>, state: &mut AppState) {
    let (border, text) = if state.dark_mode {
        (Color::DarkGray, Color::Gray)
    } else {
        (Color::White, Color::White)
    };
    let frame_block = |title: &'static str| {
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(border))
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(20),
                Constraint::Percentage(60),
                Constraint::Percentage(20),
            ]
            .as_ref(),
        )
        .split(f.area());

    // Left panel: legend rows, one per category
    let groups = state.controller.registry().groups();
    if groups.is_empty() {
        let empty = Paragraph::new("No categories")
            .block(frame_block("Legend"))
            .wrap(Wrap { trim: true });
        f.render_widget(empty, chunks[0]);
    } else {
        let items: Vec<ListItem> = groups
            .iter()
            .map(|group| {
                let checkbox = if group.visible { "[x] " } else { "[ ] " };
                let mut row_style = Style::default().fg(text);
                if !group.visible {
                    row_style = row_style.add_modifier(Modifier::DIM);
                }
                ListItem::new(Line::from(vec![
                    Span::styled(checkbox, row_style),
                    Span::styled(
                        format!("{} ", group.icon),
                        Style::default().fg(tag_color(&group.tag)),
                    ),
                    Span::styled(group.name.clone(), row_style),
                ]))
            })
            .collect();
        let mut list_state = ListState::default();
        list_state.select(Some(state.selected));
        let list = List::new(items)
            .block(frame_block("Legend"))
            .highlight_symbol(">> ")
            .highlight_style(Style::default().fg(Color::LightYellow));
        f.render_stateful_widget(list, chunks[0], &mut list_state);
    }

    // Center: the map
    state.map_area = Some(chunks[1]);
    if let Some(map) = &state.map {
        let highlight = state.selected_tag();
        map.render(
            f,
            chunks[1],
            state.controller.registry(),
            state.controller.layers(),
            highlight.as_deref(),
            state.dark_mode,
        );
    } else {
        let txt = Paragraph::new("No buildings to show")
            .block(frame_block("Campus"))
            .wrap(Wrap { trim: true });
        f.render_widget(txt, chunks[1]);
    }

    // Right panel: building details, or help
    let right = chunks[2];
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)].as_ref())
        .split(right);

    let detail_text = match &state.detail {
        Some(detail) => format!(
            "{}\n\n{}\n\n{}\n\nCenter: {:.5}, {:.5}",
            detail.name, detail.info, detail.image_note, detail.center.lat, detail.center.lng
        ),
        None => state.help_text().to_string(),
    };
    let detail_paragraph = Paragraph::new(detail_text)
        .block(frame_block("Building"))
        .style(Style::default().fg(text))
        .wrap(Wrap { trim: true });
    f.render_widget(detail_paragraph, right_chunks[0]);

    let shown = state.controller.layers().len();
    let total = state.controller.registry().polygons().len();
    let status_text = format!("{}\n{shown} of {total} buildings shown", state.status);
    let status_paragraph = Paragraph::new(status_text)
        .block(frame_block("Status"))
        .style(Style::default().fg(text))
        .wrap(Wrap { trim: true });
    f.render_widget(status_paragraph, right_chunks[1]);
}
