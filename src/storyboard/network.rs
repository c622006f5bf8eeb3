use rand::Rng;

use crate::i18n::{fill, Language, NetworkStrings};
use crate::sim::network::{self, PacketOutcome, CONSUMERS, INITIAL_BUFFERS, PRODUCERS};
use crate::storyboard::{
    palette, Animation, Color, Frame, Layer, Metadata, Position, Resolution, Scene, Shape,
    Storyboard, Stroke, Transition,
};

const PRODUCER_X: f32 = -5.0;
const CONSUMER_X: f32 = 5.0;
const GC_Y: f32 = -3.0;
const NODE_RADIUS: f32 = 0.3;
const BUFFER_RADIUS: f32 = 0.25;
const TOKEN_RADIUS: f32 = 0.25;

fn producer_pos(f: &Frame, i: usize) -> Position {
    f.at(PRODUCER_X, 1.5 - i as f32)
}

fn buffer_pos(f: &Frame, slot: usize) -> Position {
    if slot < INITIAL_BUFFERS {
        f.at(0.0, 1.5 - slot as f32)
    } else {
        // The slot wired in by the mid-run upgrade
        f.at(0.0, -2.5)
    }
}

fn consumer_pos(f: &Frame, i: usize) -> Position {
    f.at(CONSUMER_X, 1.0 - i as f32)
}

fn node(f: &Frame, at: Position, radius: f32, color: Color, alpha: u8) -> Layer {
    Layer::new(
        at.x,
        at.y,
        Shape::Circle {
            radius: f.px(radius),
            fill: Some(color.with_alpha(alpha)),
            stroke: Some(Stroke::new(color, 1.0)),
        },
    )
}

fn connection(at: Position, to: Position) -> Layer {
    Layer::new(
        at.x,
        at.y,
        Shape::Line {
            end: to,
            stroke: Stroke::new(palette::GRAY, 1.0),
            dash: None,
        },
    )
    .opacity(0.3)
}

fn text(f: &Frame, dx: f32, dy: f32, content: String, size: f32, color: Color) -> Layer {
    let pos = f.at(dx, dy);
    Layer::new(
        pos.x,
        pos.y,
        Shape::Text {
            content,
            size: f.font(size),
            color,
        },
    )
}

fn packet(f: &Frame, at: Position, value: u32) -> Layer {
    Layer::new(
        at.x,
        at.y,
        Shape::Token {
            radius: f.px(TOKEN_RADIUS),
            fill: palette::PURPLE,
            label: value.to_string(),
            label_color: palette::WHITE,
        },
    )
}

/// Title strip shared by every scene.
fn header(f: &Frame, s: &NetworkStrings, language: Language, animated: bool) -> Vec<Layer> {
    let mut title = text(f, 0.0, 3.6, s.neural_title.into(), 40.0, palette::WHITE);
    let badge_x = f.w / f.unit / 2.0 - 1.2;
    let badge_pos = f.at(badge_x, 3.65);
    let mut badge_box = Layer::new(
        badge_pos.x,
        badge_pos.y,
        Shape::Rect {
            width: f.px(1.8),
            height: f.px(0.45),
            corner_radius: f.px(0.08),
            fill: Some(palette::GOLD.with_alpha(50)),
            stroke: Some(Stroke::new(palette::GOLD, 2.0)),
        },
    );
    let mut badge = text(f, badge_x, 3.65, language.badge().into(), 14.0, palette::WHITE);
    if animated {
        title = title.fade_in(0.0, 1.5);
        badge_box = badge_box.fade_in(0.0, 1.0);
        badge = badge.fade_in(0.0, 1.0);
    }
    vec![title, badge_box, badge]
}

/// Node columns, the connection mesh, the garbage collector and the layer
/// labels. `extra_buffer` includes the post-upgrade fifth slot.
fn mesh(f: &Frame, s: &NetworkStrings, extra_buffer: bool, animated: bool) -> Vec<Layer> {
    let mut layers = Vec::new();
    let buffers = if extra_buffer {
        INITIAL_BUFFERS + 1
    } else {
        INITIAL_BUFFERS
    };

    for p in 0..PRODUCERS {
        for b in 0..buffers {
            layers.push(connection(producer_pos(f, p), buffer_pos(f, b)));
        }
    }
    for b in 0..buffers {
        for c in 0..CONSUMERS {
            layers.push(connection(buffer_pos(f, b), consumer_pos(f, c)));
        }
    }

    for p in 0..PRODUCERS {
        layers.push(node(f, producer_pos(f, p), NODE_RADIUS, palette::BLUE, 204));
    }
    for b in 0..buffers {
        layers.push(node(f, buffer_pos(f, b), BUFFER_RADIUS, palette::GREEN, 153));
    }
    for c in 0..CONSUMERS {
        layers.push(node(f, consumer_pos(f, c), NODE_RADIUS, palette::RED, 204));
    }

    let gc = f.at(0.0, GC_Y);
    layers.push(Layer::new(
        gc.x,
        gc.y,
        Shape::Rect {
            width: f.px(2.5),
            height: f.px(1.5),
            corner_radius: f.px(0.2),
            fill: Some(palette::DARK_GRAY.with_alpha(178)),
            stroke: Some(Stroke::new(palette::DARK_GRAY, 2.0)),
        },
    ));
    layers.push(text(f, 0.0, GC_Y, "GC".into(), 30.0, palette::WHITE));

    layers.push(text(f, -6.3, 1.5, s.producers.into(), 24.0, palette::BLUE));
    layers.push(text(f, 0.0, 2.2, s.buffer_layer.into(), 24.0, palette::GREEN));
    layers.push(text(f, 6.3, 1.0, s.consumers.into(), 24.0, palette::RED));
    layers.push(text(
        f,
        0.0,
        GC_Y - 0.95,
        s.garbage_collector.into(),
        20.0,
        palette::GRAY,
    ));

    if animated {
        layers = layers.into_iter().map(|l| l.fade_in(0.0, 2.0)).collect();
    }
    layers
}

/// Short highlight ring shown on a node while it is active.
fn highlight(f: &Frame, at: Position, color: Color, start: f32) -> Layer {
    Layer::new(
        at.x,
        at.y,
        Shape::Circle {
            radius: f.px(NODE_RADIUS + 0.08),
            fill: None,
            stroke: Some(Stroke::new(color, 3.0)),
        },
    )
    .fade_in(start, 0.2)
    .fade_out(start + 0.8, 0.3)
}

/// Build the multi-producer network storyboard from a fresh simulation run.
pub fn build<R: Rng>(
    language: Language,
    resolution: Resolution,
    fps: u32,
    rng: &mut R,
) -> Storyboard {
    let s = NetworkStrings::get(language);
    let f = Frame::new(&resolution);
    let trace = network::run(rng);

    // --- Scene 1: title ---------------------------------------------------
    let intro = Scene {
        id: "intro".into(),
        duration: 2.5,
        background: palette::NEAR_BLACK,
        transition: None,
        layers: header(&f, s, language, true),
    };

    // --- Scene 2: the network assembles -----------------------------------
    let mut layers = header(&f, s, language, false);
    layers.extend(mesh(&f, s, false, true));
    let assemble = Scene {
        id: "mesh".into(),
        duration: 3.5,
        background: palette::NEAR_BLACK,
        transition: None,
        layers,
    };

    // --- Scene 3: the ten cycles -------------------------------------------
    let mut layers = header(&f, s, language, false);
    layers.extend(mesh(&f, s, false, false));
    let mut tokens: Vec<Layer> = Vec::new();
    // Current occupant token per buffer slot
    let mut slot_token: Vec<Option<usize>> = vec![None; INITIAL_BUFFERS + 1];
    let gc_center = f.at(0.0, GC_Y);
    let mut t = 0.5;

    for cycle in &trace.cycles {
        layers.push(
            text(&f, 0.0, -3.6, fill(s.cycle, cycle.cycle + 1), 24.0, palette::GOLD)
                .fade_in(t, 0.3)
                .fade_out(t + 1.9, 0.3),
        );
        t += 0.4;

        // Activity lights and fresh packets
        for take in &cycle.consumed {
            layers.push(highlight(
                &f,
                consumer_pos(&f, take.consumer),
                palette::RED,
                t,
            ));
        }
        for fire in &cycle.fired {
            layers.push(highlight(
                &f,
                producer_pos(&f, fire.producer),
                palette::BLUE,
                t,
            ));
            let at = producer_pos(&f, fire.producer);
            tokens.push(packet(&f, at, fire.value).fade_in(t, 0.3));
        }
        t += 0.4;

        // Movement window: consumers pull in-flight packets, new packets
        // land in slots or drop to the collector.
        let move_end = t + 0.7;
        for take in &cycle.consumed {
            if let Some(idx) = slot_token[take.slot].take() {
                let target = consumer_pos(&f, take.consumer);
                tokens[idx] = tokens[idx]
                    .clone()
                    .animate(Animation::MoveTo {
                        start: t,
                        duration: 0.7,
                        x: target.x,
                        y: target.y,
                    })
                    .fade_out(move_end, 0.3);
            }
        }
        let mut fired_idx = tokens.len() - cycle.fired.len();
        for fire in &cycle.fired {
            match fire.outcome {
                PacketOutcome::Delivered { slot } => {
                    let target = buffer_pos(&f, slot);
                    tokens[fired_idx] = tokens[fired_idx].clone().animate(Animation::MoveTo {
                        start: t,
                        duration: 0.7,
                        x: target.x,
                        y: target.y,
                    });
                    slot_token[slot] = Some(fired_idx);
                }
                PacketOutcome::Dropped => {
                    tokens[fired_idx] = tokens[fired_idx]
                        .clone()
                        .animate(Animation::MoveTo {
                            start: t,
                            duration: 0.7,
                            x: gc_center.x,
                            y: gc_center.y,
                        })
                        .fade_out(move_end, 0.3);
                }
            }
            fired_idx += 1;
        }
        t = move_end + 0.4;

        // Cycle label clears; brief breather before the next round
        t += 0.5;

        if cycle.cycle == network::UPGRADE_CYCLE {
            // The system upgrade: a fifth buffer slot joins the mesh
            layers.push(
                text(&f, 0.0, 3.0, s.system_upgraded.into(), 32.0, palette::YELLOW)
                    .fade_in(t, 1.0)
                    .fade_out(t + 3.5, 0.5),
            );
            let new_slot = buffer_pos(&f, INITIAL_BUFFERS);
            layers.push(
                node(&f, new_slot, BUFFER_RADIUS, palette::GREEN, 153).fade_in(t, 2.0),
            );
            for p in 0..PRODUCERS {
                layers.push(connection(producer_pos(&f, p), new_slot).fade_in(t, 2.0));
            }
            for c in 0..CONSUMERS {
                layers.push(connection(new_slot, consumer_pos(&f, c)).fade_in(t, 2.0));
            }
            t += 2.0;
            layers.push(
                text(&f, 0.0, -3.2, s.buffer_added.into(), 24.0, palette::GREEN)
                    .fade_in(t, 0.5)
                    .fade_out(t + 1.5, 0.5),
            );
            t += 2.2;
        }
    }

    // Packets still buffered fade away before the stats
    for occupant in slot_token.iter().flatten() {
        tokens[*occupant] = tokens[*occupant].clone().fade_out(t, 0.5);
    }
    t += 0.7;

    layers.extend(tokens);
    let cycles_scene = Scene {
        id: "cycles".into(),
        duration: t,
        background: palette::NEAR_BLACK,
        transition: None,
        layers,
    };

    // --- Scene 4: closing statistics ---------------------------------------
    let mut layers = header(&f, s, language, false);
    layers.extend(mesh(&f, s, true, false));
    let stats = [
        (
            0.5,
            fill(s.stats_before, trace.dropped_before_upgrade),
            22.0,
            palette::ORANGE,
            0.0,
        ),
        (
            0.0,
            fill(s.stats_after, trace.dropped_after_upgrade()),
            22.0,
            palette::GREEN,
            0.3,
        ),
        (-0.6, s.improvement.to_string(), 26.0, palette::YELLOW, 0.6),
    ];
    for (dy, content, size, color, start) in stats {
        layers.push(
            text(&f, 0.0, dy, content, size, color)
                .fade_in(start, 1.0)
                .fade_out(4.5, 0.8),
        );
    }
    // Celebration ripple across the node columns
    let mut pulse_at = 5.5;
    for p in 0..PRODUCERS {
        layers.push(highlight(&f, producer_pos(&f, p), palette::GOLD, pulse_at));
        pulse_at += 0.2;
    }
    for b in 0..=INITIAL_BUFFERS {
        layers.push(highlight(&f, buffer_pos(&f, b), palette::GOLD, pulse_at));
        pulse_at += 0.2;
    }
    for c in 0..CONSUMERS {
        layers.push(highlight(&f, consumer_pos(&f, c), palette::GOLD, pulse_at));
        pulse_at += 0.2;
    }
    layers.push(
        text(&f, 0.0, -3.6, s.end_text.into(), 36.0, palette::GOLD).fade_in(6.0, 1.0),
    );
    let stats_scene = Scene {
        id: "stats".into(),
        duration: 9.5,
        background: palette::NEAR_BLACK,
        transition: Some(Transition::Fade { duration: 1.0 }),
        layers,
    };

    let scenes = vec![intro, assemble, cycles_scene, stats_scene];
    let duration = scenes.iter().map(|sc| sc.duration).sum();
    Storyboard {
        metadata: Metadata {
            title: s.neural_title.into(),
            resolution,
            fps,
            duration,
            language,
            description: Some(format!(
                "{} produced, {} consumed, {} dropped",
                trace.produced, trace.consumed, trace.dropped
            )),
        },
        scenes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_board() -> Storyboard {
        let mut rng = StdRng::seed_from_u64(2);
        build(
            Language::En,
            Resolution::Named("1920x1080".into()),
            30,
            &mut rng,
        )
    }

    #[test]
    fn test_scene_lineup() {
        let board = test_board();
        let ids: Vec<&str> = board.scenes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["intro", "mesh", "cycles", "stats"]);
        let total: f32 = board.scenes.iter().map(|s| s.duration).sum();
        assert!((total - board.metadata.duration).abs() < 1e-3);
    }

    #[test]
    fn test_animation_windows_inside_scenes() {
        let board = test_board();
        for scene in &board.scenes {
            for layer in &scene.layers {
                for anim in &layer.animations {
                    assert!(
                        anim.end() <= scene.duration + 1e-3,
                        "animation ends at {} in '{}' ({}s)",
                        anim.end(),
                        scene.id,
                        scene.duration
                    );
                }
            }
        }
    }

    #[test]
    fn test_upgrade_adds_fifth_buffer_node() {
        let board = test_board();
        let cycles = &board.scenes[2];
        let fifth = buffer_pos(
            &Frame::new(&Resolution::Named("1920x1080".into())),
            INITIAL_BUFFERS,
        );
        let has_new_node = cycles.layers.iter().any(|l| {
            matches!(l.shape, Shape::Circle { .. })
                && (l.position.x - fifth.x).abs() < 0.5
                && (l.position.y - fifth.y).abs() < 0.5
                && l.visible_from > 0.0
        });
        assert!(has_new_node);
    }

    #[test]
    fn test_stats_scene_reports_drop_split() {
        let mut rng = StdRng::seed_from_u64(2);
        let trace = network::run(&mut rng);
        let board = test_board();
        let stats = &board.scenes[3];
        let expected = fill(
            NetworkStrings::get(Language::En).stats_before,
            trace.dropped_before_upgrade,
        );
        let found = stats
            .layers
            .iter()
            .any(|l| matches!(&l.shape, Shape::Text { content, .. } if *content == expected));
        assert!(found);
    }
}
