use iced::{
    widget::{button, column, container, mouse_area, row, text, text_input, Space},
    Alignment, Element, Length, Point,
};

use crate::application::Session;
use crate::drag::DragGesture;

const FOOTER_HEIGHT: f32 = 60.0;

/// Main view state
pub struct DownloadView {
    pub page_url: String,
    pub loaded_url: Option<String>,
    pub last_title: Option<String>,
    gesture: DragGesture,
}

impl DownloadView {
    pub fn new(start_url: &str) -> Self {
        Self {
            page_url: start_url.to_string(),
            loaded_url: None,
            last_title: None,
            gesture: DragGesture::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    PageUrlChanged(String),
    GoPressed,
    DownloadPressed,
    DragPressed,
    DragMoved(Point),
    DragReleased,
}

impl DownloadView {
    /// Local bookkeeping. Returns true when a drag gesture has just started.
    pub fn update(&mut self, message: &DownloadMessage) -> bool {
        match message {
            DownloadMessage::PageUrlChanged(url) => {
                self.page_url = url.clone();
            }
            DownloadMessage::DragPressed => self.gesture.pressed(),
            DownloadMessage::DragMoved(position) => return self.gesture.moved(*position),
            DownloadMessage::DragReleased => self.gesture.released(),
            DownloadMessage::GoPressed | DownloadMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
        false
    }

    pub fn view<'a>(&'a self, session: &Session) -> Element<'a, DownloadMessage> {
        let navigation = row![
            text_input("Page URL...", &self.page_url)
                .on_input(DownloadMessage::PageUrlChanged)
                .on_submit(DownloadMessage::GoPressed)
                .padding(8),
            button("Go")
                .on_press_maybe(session.is_surface_ready().then_some(DownloadMessage::GoPressed))
                .padding([8, 16]),
        ]
        .spacing(10);

        let page: Element<'a, DownloadMessage> = match session.overlay_message() {
            Some(message) => text(message).size(20).into(),
            None => column![
                text(
                    self.loaded_url
                        .clone()
                        .unwrap_or_else(|| "No page loaded".to_string())
                )
                .size(16),
                text(
                    self.last_title
                        .as_ref()
                        .map(|t| format!("Last title: {}", t))
                        .unwrap_or_default()
                )
                .size(14),
            ]
            .spacing(8)
            .into(),
        };

        let page = container(page)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill);

        column![
            navigation,
            page,
            Space::new().height(Length::Fixed(10.0)),
            self.footer(session),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }

    fn footer<'a>(&'a self, session: &Session) -> Element<'a, DownloadMessage> {
        if session.drag_visible() {
            let tile = container(text("DRAG TO DAW").size(18))
                .width(Length::Fill)
                .height(Length::Fixed(FOOTER_HEIGHT))
                .center_x(Length::Fill)
                .center_y(Length::Fixed(FOOTER_HEIGHT))
                .style(container::bordered_box);

            return mouse_area(tile)
                .interaction(iced::mouse::Interaction::Grab)
                .on_press(DownloadMessage::DragPressed)
                .on_move(DownloadMessage::DragMoved)
                .on_release(DownloadMessage::DragReleased)
                .into();
        }

        if !session.trigger_visible() {
            return Space::new().height(Length::Fixed(FOOTER_HEIGHT)).into();
        }

        let trigger = button(
            container(text(session.trigger_label()).size(16)).center_x(Length::Fill),
        )
        .width(Length::Fill)
        .height(Length::Fixed(FOOTER_HEIGHT))
        .padding([10, 20])
        .on_press_maybe(session.trigger_enabled().then_some(DownloadMessage::DownloadPressed));

        row![trigger].align_y(Alignment::Center).into()
    }
}
