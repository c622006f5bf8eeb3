use crate::i18n::{ClockStrings, Language};
use crate::sim::clock::ClockSignal;
use crate::storyboard::{
    palette, Animation, Frame, Layer, Metadata, Position, Resolution, Scene, Shape, Storyboard,
    Stroke, Transition,
};

// Axis geometry in unit space: x covers 0..8 ns over 10 units, y covers
// -0.5..4 V over 4 units, both centered like the source scene's Axes.
const X_MIN_NS: f32 = 0.0;
const X_MAX_NS: f32 = 8.0;
const Y_MIN_V: f32 = -0.5;
const Y_MAX_V: f32 = 4.0;
const X_LENGTH: f32 = 10.0;
const Y_LENGTH: f32 = 4.0;

fn axis_x(t_ns: f32) -> f32 {
    -X_LENGTH / 2.0 + (t_ns - X_MIN_NS) / (X_MAX_NS - X_MIN_NS) * X_LENGTH
}

fn axis_y(volts: f32) -> f32 {
    -Y_LENGTH / 2.0 + (volts - Y_MIN_V) / (Y_MAX_V - Y_MIN_V) * Y_LENGTH
}

fn grid_layer(f: &Frame, opacity: f32) -> Layer {
    Layer::new(
        0.0,
        0.0,
        Shape::Grid {
            spacing: f.px(1.0),
            stroke: Stroke::new(palette::BLUE_DEEP, 1.0),
        },
    )
    .opacity(opacity)
}

fn text(f: &Frame, dx: f32, dy: f32, content: String, size: f32, color: crate::storyboard::Color) -> Layer {
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

/// Axes, tick labels and axis captions. `animated` staggers the create/write
/// schedule of the signal scene; statics are used by the follow-up scenes.
fn axes_layers(f: &Frame, s: &ClockStrings, animated: bool) -> Vec<Layer> {
    let mut layers = Vec::new();
    let staged = |layer: Layer, start: f32, duration: f32| -> Layer {
        if animated {
            layer.fade_in(start, duration)
        } else {
            layer
        }
    };

    let origin_y = axis_y(0.0);
    let x_start = f.at(axis_x(X_MIN_NS) - 0.2, origin_y);
    layers.push(staged(
        Layer::new(
            x_start.x,
            x_start.y,
            Shape::Arrow {
                end: f.at(axis_x(X_MAX_NS) + 0.3, origin_y),
                stroke: Stroke::new(palette::BLUE, 2.0),
            },
        ),
        0.0,
        2.0,
    ));
    let y_start = f.at(axis_x(X_MIN_NS), axis_y(Y_MIN_V) - 0.2);
    layers.push(staged(
        Layer::new(
            y_start.x,
            y_start.y,
            Shape::Arrow {
                end: f.at(axis_x(X_MIN_NS), axis_y(Y_MAX_V) + 0.3),
                stroke: Stroke::new(palette::BLUE, 2.0),
            },
        ),
        0.0,
        2.0,
    ));

    for tick in [0.0, 2.0, 4.0, 6.0, 8.0] {
        layers.push(staged(
            text(
                f,
                axis_x(tick),
                origin_y - 0.35,
                format!("{}", tick as u32),
                24.0,
                palette::LIGHT_GRAY,
            ),
            0.0,
            2.0,
        ));
    }
    for volts in [0.0, 3.3] {
        layers.push(staged(
            text(
                f,
                axis_x(X_MIN_NS) - 0.55,
                axis_y(volts),
                format!("{:.1}", volts),
                24.0,
                palette::LIGHT_GRAY,
            ),
            0.0,
            2.0,
        ));
    }

    layers.push(staged(
        text(
            f,
            0.0,
            origin_y - 0.9,
            format!("{} ({})", s.time_axis, s.time_unit),
            28.0,
            palette::WHITE,
        ),
        2.0,
        1.0,
    ));
    layers.push(staged(
        text(
            f,
            axis_x(X_MIN_NS) - 1.3,
            axis_y(Y_MAX_V / 2.0),
            s.voltage_axis.into(),
            28.0,
            palette::WHITE,
        ),
        2.0,
        1.0,
    ));

    layers
}

fn waveform_points(f: &Frame, clock: &ClockSignal) -> Vec<Position> {
    clock
        .waveform_points(32)
        .into_iter()
        .map(|(t, v)| f.at(axis_x(t), axis_y(v)))
        .collect()
}

fn waveform_layer(f: &Frame, clock: &ClockSignal, animated: bool) -> Layer {
    let layer = Layer::new(
        0.0,
        0.0,
        Shape::Polyline {
            points: waveform_points(f, clock),
            stroke: Stroke::new(palette::YELLOW, 4.0),
        },
    );
    if animated {
        layer.fade_in(3.0, 3.0)
    } else {
        layer
    }
}

/// Dashed HIGH/LOW guides with their digit labels.
fn guide_layers(f: &Frame, s: &ClockStrings, clock: &ClockSignal, animated: bool) -> Vec<Layer> {
    let mut layers = Vec::new();
    let guides = [
        (clock.v_high, "1", s.high, palette::GREEN),
        (clock.v_low, "0", s.low, palette::RED),
    ];
    for (volts, digit, label, color) in guides {
        let start = f.at(axis_x(X_MIN_NS), axis_y(volts));
        let mut line = Layer::new(
            start.x,
            start.y,
            Shape::Line {
                end: f.at(axis_x(X_MAX_NS), axis_y(volts)),
                stroke: Stroke::new(color, 2.0),
                dash: Some(f.px(0.1)),
            },
        );
        let mut digit_layer = text(f, axis_x(X_MIN_NS) - 1.2, axis_y(volts) + 0.15, digit.into(), 32.0, color);
        let mut label_layer = text(f, axis_x(X_MIN_NS) - 1.2, axis_y(volts) - 0.25, label.into(), 20.0, color);
        if animated {
            line = line.fade_in(6.5, 1.0);
            digit_layer = digit_layer.fade_in(6.5, 1.0).animate(Animation::Pulse {
                start: 7.5,
                duration: 1.0,
                scale: 1.2,
            });
            label_layer = label_layer.fade_in(6.5, 1.0);
        }
        layers.push(line);
        layers.push(digit_layer);
        layers.push(label_layer);
    }
    layers
}

fn signal_statics(f: &Frame, s: &ClockStrings, clock: &ClockSignal) -> Vec<Layer> {
    let mut layers = vec![grid_layer(f, 0.1)];
    layers.extend(axes_layers(f, s, false));
    layers.push(waveform_layer(f, clock, false));
    layers.extend(guide_layers(f, s, clock, false));
    layers
}

/// Build the CPU clock storyboard.
pub fn build(language: Language, resolution: Resolution, fps: u32) -> Storyboard {
    let s = ClockStrings::get(language);
    let f = Frame::new(&resolution);
    let clock = ClockSignal::default();

    // --- Scene 1: intro ---------------------------------------------------
    let intro = Scene {
        id: "intro".into(),
        duration: 7.0,
        background: palette::BLACK,
        transition: None,
        layers: vec![
            grid_layer(&f, 0.2)
                .fade_in(0.0, 1.0)
                .animate(Animation::FadeTo {
                    start: 5.0,
                    duration: 1.5,
                    opacity: 0.1,
                }),
            text(&f, 0.0, 0.5, s.intro_title.into(), 56.0, palette::BLUE)
                .fade_in(0.0, 2.0)
                .fade_out(5.0, 1.5),
            text(&f, 0.0, -0.5, s.intro_text.into(), 28.0, palette::WHITE)
                .fade_in(2.0, 1.0)
                .fade_out(5.0, 1.5),
        ],
    };

    // --- Scene 2: axes and the signal ------------------------------------
    let mut layers = vec![grid_layer(&f, 0.1)];
    layers.extend(axes_layers(&f, s, true));
    layers.push(waveform_layer(&f, &clock, true));
    layers.extend(guide_layers(&f, s, &clock, true));
    let signal = Scene {
        id: "signal".into(),
        duration: 9.5,
        background: palette::BLACK,
        transition: None,
        layers,
    };

    // --- Scene 3: tracker sweep with live readout -------------------------
    let mut layers = signal_statics(&f, s, &clock);
    let right_units = f.w / f.unit / 2.0;
    let panel = f.at(right_units - 2.8, 3.0);
    layers.push(
        Layer::new(
            panel.x,
            panel.y,
            Shape::Rect {
                width: f.px(5.0),
                height: f.px(1.5),
                corner_radius: f.px(0.2),
                fill: Some(palette::BLACK.with_alpha(230)),
                stroke: Some(Stroke::new(palette::BLUE, 2.0)),
            },
        )
        .fade_in(0.0, 1.0),
    );

    let sweep_start = 1.0;
    let sweep_duration = 6.0;
    let dot_home = f.at(axis_x(0.0), axis_y(clock.voltage_at(0.0)));
    layers.push(
        Layer::new(
            dot_home.x,
            dot_home.y,
            Shape::Circle {
                radius: f.px(0.15),
                fill: Some(palette::BLUE),
                stroke: None,
            },
        )
        .fade_in(0.0, 0.5)
        .animate(Animation::MoveAlong {
            start: sweep_start,
            duration: sweep_duration,
            points: waveform_points(&f, &clock),
        }),
    );

    // Periodic readout updates standing in for the per-frame redraw of the
    // source scene.
    let updates = 8;
    for k in 0..=updates {
        let elapsed = k as f32 / updates as f32;
        let at = sweep_start + elapsed * sweep_duration;
        let t_ns = elapsed * clock.total_ns();
        let volts = clock.voltage_at(t_ns);
        let until = if k < updates {
            Some(at + sweep_duration / updates as f32)
        } else {
            None
        };

        let mut time_line = text(
            &f,
            right_units - 2.8,
            3.3,
            format!("{}: {:.2} {}", s.current_time, t_ns, s.time_unit),
            22.0,
            palette::BLUE,
        )
        .appear(at);
        let mut volt_line = text(
            &f,
            right_units - 2.8,
            2.7,
            format!("{}: {:.2}V", s.current_voltage, volts),
            22.0,
            palette::YELLOW,
        )
        .appear(at);
        if let Some(until) = until {
            time_line = time_line.fade_out(until, 0.05);
            volt_line = volt_line.fade_out(until, 0.05);
        }
        layers.push(time_line);
        layers.push(volt_line);
    }

    let tracker = Scene {
        id: "tracker".into(),
        duration: 8.0,
        background: palette::BLACK,
        transition: None,
        layers,
    };

    // --- Scene 4: period and frequency ------------------------------------
    let mut layers = signal_statics(&f, s, &clock);
    let base_y = axis_y(Y_MIN_V) - 0.5;
    let line_start = f.at(axis_x(0.0), base_y);
    layers.push(
        Layer::new(
            line_start.x,
            line_start.y,
            Shape::Line {
                end: f.at(axis_x(clock.period_ns), base_y),
                stroke: Stroke::new(palette::YELLOW, 3.0),
                dash: None,
            },
        )
        .fade_in(0.0, 0.5)
        .fade_out(5.5, 1.5),
    );
    for t_ns in [0.0, clock.period_ns] {
        let from = f.at(axis_x(t_ns), base_y);
        layers.push(
            Layer::new(
                from.x,
                from.y,
                Shape::Arrow {
                    end: f.at(axis_x(t_ns), base_y + 0.3),
                    stroke: Stroke::new(palette::YELLOW, 2.0),
                },
            )
            .fade_in(0.0, 0.5)
            .fade_out(5.5, 1.5),
        );
    }
    let annotations = [
        (
            axis_x(clock.period_ns / 2.0),
            base_y - 0.4,
            s.period.to_string(),
            24.0,
            palette::YELLOW,
            0.5,
        ),
        (
            axis_x(clock.period_ns / 2.0),
            base_y - 0.75,
            format!("{} {}", clock.period_ns, s.time_unit),
            32.0,
            palette::WHITE,
            0.5,
        ),
        (
            2.5,
            base_y - 0.4,
            format!(
                "f = 1/T = 1/{} {} = {:.0} MHz",
                clock.period_ns,
                s.time_unit,
                clock.frequency_mhz()
            ),
            28.0,
            palette::WHITE,
            1.2,
        ),
        (
            2.5,
            base_y - 0.85,
            format!("{}: 3-5 {}", s.modern_cpu, s.freq_unit),
            24.0,
            palette::WHITE,
            2.0,
        ),
        (
            2.5,
            base_y - 1.2,
            format!("= 3-5 {}", s.cycles_per_second),
            20.0,
            palette::GRAY,
            2.0,
        ),
    ];
    for (dx, dy, content, size, color, start) in annotations {
        layers.push(
            text(&f, dx, dy, content, size, color)
                .fade_in(start, 0.7)
                .fade_out(5.5, 1.5),
        );
    }
    let period = Scene {
        id: "period".into(),
        duration: 7.0,
        background: palette::BLACK,
        transition: None,
        layers,
    };

    // --- Scene 5: rising and falling edges --------------------------------
    let mut layers = signal_statics(&f, s, &clock);
    let mid_v = (clock.v_high + clock.v_low) / 2.0;
    let edge_specs = [
        // (time, from-volts, to-volts, label, color, window start, hide at)
        (
            0.0,
            clock.v_low,
            clock.v_high,
            s.rising_edge,
            palette::GREEN,
            0.0f32,
            5.0f32,
        ),
        (
            clock.period_ns / 2.0,
            clock.v_high,
            clock.v_low,
            s.falling_edge,
            palette::RED,
            6.2,
            9.4,
        ),
    ];
    for (t_ns, from_v, to_v, label, color, window, hide) in edge_specs {
        let center = f.at(axis_x(t_ns), axis_y(mid_v));
        layers.push(
            Layer::new(
                center.x,
                center.y,
                Shape::Rect {
                    width: f.px(1.5),
                    height: f.px(4.5),
                    corner_radius: 0.0,
                    fill: None,
                    stroke: Some(Stroke::new(palette::YELLOW, 2.0)),
                },
            )
            .fade_in(window, 0.5)
            .fade_out(hide, 1.0),
        );
        let from = f.at(axis_x(t_ns), axis_y(from_v));
        layers.push(
            Layer::new(
                from.x,
                from.y,
                Shape::Arrow {
                    end: f.at(axis_x(t_ns), axis_y(to_v)),
                    stroke: Stroke::new(color, 4.0),
                },
            )
            .fade_in(window + 0.7, 0.5)
            .fade_out(hide, 1.0),
        );
        layers.push(
            text(&f, axis_x(t_ns) + 1.9, axis_y(mid_v), label.into(), 28.0, color)
                .fade_in(window + 1.2, 0.5)
                .fade_out(hide, 1.0),
        );
        layers.push(
            Layer::new(
                center.x,
                center.y,
                Shape::Circle {
                    radius: f.px(0.3),
                    fill: None,
                    stroke: Some(Stroke::new(color, 3.0)),
                },
            )
            .fade_in(window + 1.9, 0.2)
            .animate(Animation::Pulse {
                start: window + 1.9,
                duration: 1.0,
                scale: 3.0,
            })
            .fade_out(window + 2.4, 0.5),
        );
    }
    layers.push(
        text(
            &f,
            axis_x(0.0) + 1.9,
            axis_y(mid_v) - 0.7,
            s.edge_trigger.into(),
            20.0,
            palette::WHITE,
        )
        .fade_in(3.0, 0.5)
        .fade_out(5.0, 1.0),
    );
    let edges = Scene {
        id: "edges".into(),
        duration: 10.5,
        background: palette::BLACK,
        transition: Some(Transition::Fade { duration: 1.5 }),
        layers,
    };

    let scenes = vec![intro, signal, tracker, period, edges];
    let duration = scenes.iter().map(|sc| sc.duration).sum();
    Storyboard {
        metadata: Metadata {
            title: s.title.into(),
            resolution,
            fps,
            duration,
            language,
            description: Some(format!(
                "{} cycles at {:.0} MHz",
                clock.cycles,
                clock.frequency_mhz()
            )),
        },
        scenes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_board() -> Storyboard {
        build(Language::En, Resolution::Named("1920x1080".into()), 30)
    }

    #[test]
    fn test_scene_lineup() {
        let board = test_board();
        let ids: Vec<&str> = board.scenes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["intro", "signal", "tracker", "period", "edges"]);
        let total: f32 = board.scenes.iter().map(|s| s.duration).sum();
        assert!((total - board.metadata.duration).abs() < 1e-3);
    }

    #[test]
    fn test_axis_mapping() {
        assert!((axis_x(0.0) - (-5.0)).abs() < 1e-5);
        assert!((axis_x(8.0) - 5.0).abs() < 1e-5);
        assert!((axis_y(-0.5) - (-2.0)).abs() < 1e-5);
        assert!((axis_y(4.0) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_animation_windows_inside_scenes() {
        let board = test_board();
        for scene in &board.scenes {
            for layer in &scene.layers {
                for anim in &layer.animations {
                    assert!(anim.end() <= scene.duration + 1e-3);
                }
            }
        }
    }

    #[test]
    fn test_tracker_scene_has_sweeping_dot() {
        let board = test_board();
        let tracker = &board.scenes[2];
        let has_sweep = tracker.layers.iter().any(|l| {
            l.animations
                .iter()
                .any(|a| matches!(a, Animation::MoveAlong { .. }))
        });
        assert!(has_sweep);
    }

    #[test]
    fn test_turkish_labels() {
        let board = build(Language::Tr, Resolution::Named("1920x1080".into()), 30);
        assert_eq!(board.metadata.title, "CPU Saat Sinyali");
    }
}
