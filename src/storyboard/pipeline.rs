use std::collections::VecDeque;

use rand::Rng;

use crate::i18n::{fill, Language, PipelineStrings};
use crate::sim::pipeline::{self, PipelineEvent, PIPELINE_CAPACITY, PIPELINE_CYCLES};
use crate::storyboard::{
    palette, Animation, Frame, Layer, Metadata, Position, Resolution, Scene, Shape, Storyboard,
    Stroke, Transition,
};

// Unit-space layout lifted from the source scene: producer on the left,
// buffer center, consumer right, all sitting above the cycle label strip.
const PRODUCER_X: f32 = -4.5;
const CONSUMER_X: f32 = 4.5;
const BOX_Y: f32 = 0.65;
const BUFFER_BOX_Y: f32 = 0.45;
const LABEL_Y: f32 = 2.15;
const STATUS_Y: f32 = 2.75;
const CYCLE_LABEL_Y: f32 = -3.3;
const TOKEN_RADIUS: f32 = 0.25;

/// The static furniture of every scene: title, language badge, the three
/// boxes with their labels, and the flow arrows. When `animated` the layers
/// fade in on the setup schedule; otherwise they are simply present.
fn chrome(f: &Frame, s: &PipelineStrings, language: Language, animated: bool) -> Vec<Layer> {
    let mut layers = Vec::new();
    let staged = |layer: Layer, start: f32, duration: f32| -> Layer {
        if animated {
            layer.fade_in(start, duration)
        } else {
            layer
        }
    };

    let title_pos = f.at(0.0, 3.5);
    layers.push(staged(
        Layer::new(
            title_pos.x,
            title_pos.y,
            Shape::Text {
                content: s.title.into(),
                size: f.font(48.0),
                color: palette::WHITE,
            },
        ),
        0.0,
        2.0,
    ));

    let badge_pos = f.at(f.w / f.unit / 2.0 - 1.3, 3.6);
    layers.push(staged(
        Layer::new(
            badge_pos.x,
            badge_pos.y,
            Shape::Rect {
                width: f.px(2.0),
                height: f.px(0.5),
                corner_radius: f.px(0.1),
                fill: Some(palette::GOLD.with_alpha(50)),
                stroke: Some(Stroke::new(palette::GOLD, 2.0)),
            },
        ),
        0.0,
        1.0,
    ));
    layers.push(staged(
        Layer::new(
            badge_pos.x,
            badge_pos.y,
            Shape::Text {
                content: language.badge().into(),
                size: f.font(16.0),
                color: palette::WHITE,
            },
        ),
        0.0,
        1.0,
    ));

    // Producer / buffer / consumer stations
    let stations: [(&str, f32, f32, f32, f32, crate::storyboard::Color, f32); 3] = [
        (s.producer, PRODUCER_X, BOX_Y, 3.0, 2.5, palette::BLUE, 2.5),
        (s.buffer, 0.0, BUFFER_BOX_Y, 3.5, 3.5, palette::GREEN, 4.3),
        (s.consumer, CONSUMER_X, BOX_Y, 3.0, 2.5, palette::RED, 6.1),
    ];
    for (label, x, y, w, h, color, start) in stations {
        let box_pos = f.at(x, y);
        layers.push(staged(
            Layer::new(
                box_pos.x,
                box_pos.y,
                Shape::Rect {
                    width: f.px(w),
                    height: f.px(h),
                    corner_radius: f.px(0.15),
                    fill: Some(color.with_alpha(26)),
                    stroke: Some(Stroke::new(color, 3.0)),
                },
            ),
            start,
            1.5,
        ));
        let label_y = if label == s.buffer { 2.65 } else { LABEL_Y };
        let label_pos = f.at(x, label_y);
        layers.push(staged(
            Layer::new(
                label_pos.x,
                label_pos.y,
                Shape::Text {
                    content: label.into(),
                    size: f.font(32.0),
                    color,
                },
            ),
            start,
            1.5,
        ));
    }

    // Capacity caption under the buffer box
    let size_pos = f.at(0.0, -1.65);
    layers.push(staged(
        Layer::new(
            size_pos.x,
            size_pos.y,
            Shape::Text {
                content: fill(s.buffer_size, PIPELINE_CAPACITY),
                size: f.font(20.0),
                color: palette::LIGHT_GRAY,
            },
        ),
        4.3,
        1.5,
    ));

    // Flow arrows
    let arrows = [
        (f.at(-2.95, 0.3), f.at(-1.8, 0.3)),
        (f.at(1.8, 0.3), f.at(2.95, 0.3)),
    ];
    for (from, to) in arrows {
        layers.push(staged(
            Layer::new(
                from.x,
                from.y,
                Shape::Arrow {
                    end: to,
                    stroke: Stroke::new(palette::YELLOW, 4.0),
                },
            ),
            8.1,
            1.0,
        ));
    }

    layers
}

fn slot_position(f: &Frame, slot: usize) -> Position {
    let col = (slot % 3) as f32;
    let row = (slot / 3) as f32;
    f.at((col - 1.0) * 0.7, BUFFER_BOX_Y + (0.5 - row) * 0.7)
}

fn token(f: &Frame, at: Position, value: u32) -> Layer {
    Layer::new(
        at.x,
        at.y,
        Shape::Token {
            radius: f.px(TOKEN_RADIUS),
            fill: palette::BLUE_DEEP,
            label: value.to_string(),
            label_color: palette::WHITE,
        },
    )
}

fn status_text(f: &Frame, x: f32, content: &str, color: crate::storyboard::Color) -> Layer {
    let pos = f.at(x, STATUS_Y);
    Layer::new(
        pos.x,
        pos.y,
        Shape::Text {
            content: content.into(),
            size: f.font(28.0),
            color,
        },
    )
}

/// Build the producer-consumer storyboard from a fresh simulation run.
pub fn build<R: Rng>(
    language: Language,
    resolution: Resolution,
    fps: u32,
    rng: &mut R,
) -> Storyboard {
    let s = PipelineStrings::get(language);
    let f = Frame::new(&resolution);
    let trace = pipeline::run(rng);

    // --- Scene 1: everything assembles ---------------------------------
    let setup = Scene {
        id: "setup".into(),
        duration: 10.0,
        background: palette::CHARCOAL,
        transition: None,
        layers: chrome(&f, s, language, true),
    };

    // --- Scene 2: the eight cycles --------------------------------------
    let mut layers = chrome(&f, s, language, false);
    let mut tokens: Vec<Layer> = Vec::new();
    let mut live: VecDeque<usize> = VecDeque::new();
    // (queue length shown, visible from)
    let mut counter_changes: Vec<(usize, f32)> = vec![(0, 0.0)];
    let mut t = 0.5;

    let producer_center = f.at(PRODUCER_X, BOX_Y);
    let consumer_center = f.at(CONSUMER_X, BOX_Y);

    for cycle in &trace.cycles {
        let cycle_start = t;
        t += 0.5;

        for event in &cycle.events {
            match event {
                PipelineEvent::Produced { value, slot } => {
                    let status = status_text(&f, PRODUCER_X, s.producing, palette::BLUE)
                        .fade_in(t, 0.3);
                    t += 0.5;

                    let mut item = token(&f, producer_center, *value).fade_in(t, 0.3);
                    t += 0.4;
                    let target = slot_position(&f, *slot);
                    item = item.animate(Animation::MoveTo {
                        start: t,
                        duration: 0.6,
                        x: target.x,
                        y: target.y,
                    });
                    t += 0.6;
                    live.push_back(tokens.len());
                    tokens.push(item);

                    counter_changes.push((live.len(), t));
                    t += 0.3;
                    layers.push(status.fade_out(t, 0.3));
                    t += 0.3;
                }
                PipelineEvent::ProducerBlocked => {
                    let status = status_text(&f, PRODUCER_X, s.waiting, palette::ORANGE)
                        .fade_in(t, 0.3);
                    t += 1.0;
                    layers.push(status.fade_out(t, 0.3));
                    t += 0.3;
                }
                PipelineEvent::Consumed { .. } => {
                    let status = status_text(&f, CONSUMER_X, s.consuming, palette::RED)
                        .fade_in(t, 0.3);
                    t += 0.5;

                    if let Some(head) = live.pop_front() {
                        tokens[head] = tokens[head]
                            .clone()
                            .animate(Animation::MoveTo {
                                start: t,
                                duration: 0.6,
                                x: consumer_center.x,
                                y: consumer_center.y,
                            })
                            .fade_out(t + 0.6, 0.4);
                        t += 1.0;

                        // Remaining items close the gap at the head
                        for (new_slot, &idx) in live.iter().enumerate() {
                            let target = slot_position(&f, new_slot);
                            tokens[idx] = tokens[idx].clone().animate(Animation::MoveTo {
                                start: t,
                                duration: 0.3,
                                x: target.x,
                                y: target.y,
                            });
                        }
                        t += 0.3;
                    }

                    counter_changes.push((live.len(), t));
                    t += 0.3;
                    layers.push(status.fade_out(t, 0.3));
                    t += 0.3;
                }
            }
        }

        let label_pos = f.at(0.0, CYCLE_LABEL_Y);
        layers.push(
            Layer::new(
                label_pos.x,
                label_pos.y,
                Shape::Text {
                    content: fill(s.cycle, cycle.cycle + 1),
                    size: f.font(28.0),
                    color: palette::GOLD,
                },
            )
            .fade_in(cycle_start, 0.4)
            .fade_out(t, 0.3),
        );
        t += 0.6;
    }

    // Emit the "Current: N" counter as a chain of replacing text layers.
    let counter_pos = f.at(0.0, -2.05);
    for (i, (count, from)) in counter_changes.iter().enumerate() {
        let mut layer = Layer::new(
            counter_pos.x,
            counter_pos.y,
            Shape::Text {
                content: fill(s.current_size, count),
                size: f.font(24.0),
                color: palette::YELLOW,
            },
        )
        .appear(*from);
        if let Some((_, until)) = counter_changes.get(i + 1) {
            layer = layer.fade_out(*until, 0.15);
        }
        layers.push(layer);
    }

    layers.extend(tokens);
    let cycles_scene = Scene {
        id: "cycles".into(),
        duration: t + 0.5,
        background: palette::CHARCOAL,
        transition: None,
        layers,
    };

    // --- Scene 3: completion banner -------------------------------------
    let mut finale_layers = chrome(&f, s, language, false);
    let counter_pos = f.at(0.0, -2.05);
    finale_layers.push(Layer::new(
        counter_pos.x,
        counter_pos.y,
        Shape::Text {
            content: fill(s.current_size, trace.final_len),
            size: f.font(24.0),
            color: palette::YELLOW,
        },
    ));
    // Items still buffered stay on screen to the end
    for (i, value) in surviving_values(&trace).iter().enumerate() {
        let at = slot_position(&f, i);
        finale_layers.push(token(&f, at, *value));
    }
    let end_pos = f.at(0.0, -2.9);
    finale_layers.push(
        Layer::new(
            end_pos.x,
            end_pos.y,
            Shape::Text {
                content: s.end_text.into(),
                size: f.font(40.0),
                color: palette::GOLD,
            },
        )
        .fade_in(0.0, 1.0),
    );

    let finale = Scene {
        id: "finale".into(),
        duration: 3.5,
        background: palette::CHARCOAL,
        transition: Some(Transition::Fade { duration: 1.0 }),
        layers: finale_layers,
    };

    let duration = setup.duration + cycles_scene.duration + finale.duration;
    Storyboard {
        metadata: Metadata {
            title: s.title.into(),
            resolution,
            fps,
            duration,
            language,
            description: Some(format!(
                "{} cycles, buffer capacity {}",
                PIPELINE_CYCLES, PIPELINE_CAPACITY
            )),
        },
        scenes: vec![setup, cycles_scene, finale],
    }
}

/// Values still in the buffer after the run, head first.
fn surviving_values(trace: &pipeline::PipelineTrace) -> Vec<u32> {
    let mut queue = VecDeque::new();
    for cycle in &trace.cycles {
        for event in &cycle.events {
            match event {
                PipelineEvent::Produced { value, .. } => queue.push_back(*value),
                PipelineEvent::Consumed { .. } => {
                    queue.pop_front();
                }
                PipelineEvent::ProducerBlocked => {}
            }
        }
    }
    queue.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_board() -> Storyboard {
        let mut rng = StdRng::seed_from_u64(4);
        build(
            Language::En,
            Resolution::Named("1920x1080".into()),
            30,
            &mut rng,
        )
    }

    #[test]
    fn test_three_scenes_and_duration() {
        let board = test_board();
        assert_eq!(board.scenes.len(), 3);
        let total: f32 = board.scenes.iter().map(|s| s.duration).sum();
        assert!((total - board.metadata.duration).abs() < 1e-3);
    }

    #[test]
    fn test_animation_windows_inside_scene() {
        let board = test_board();
        for scene in &board.scenes {
            for layer in &scene.layers {
                for anim in &layer.animations {
                    assert!(
                        anim.end() <= scene.duration + 1e-3,
                        "animation ends at {} in scene '{}' lasting {}",
                        anim.end(),
                        scene.id,
                        scene.duration
                    );
                }
            }
        }
    }

    #[test]
    fn test_language_flows_into_layers() {
        let mut rng = StdRng::seed_from_u64(4);
        let board = build(
            Language::Tr,
            Resolution::Named("1280x720".into()),
            30,
            &mut rng,
        );
        let has_turkish_title = board.scenes[0].layers.iter().any(|l| {
            matches!(&l.shape, Shape::Text { content, .. } if content == "Üretici-Tüketici Mekanizması")
        });
        assert!(has_turkish_title);
    }

    #[test]
    fn test_surviving_tokens_match_trace() {
        let mut rng = StdRng::seed_from_u64(4);
        let trace = pipeline::run(&mut rng);
        assert_eq!(surviving_values(&trace).len(), trace.final_len);
    }
}
