use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// On-screen label language. The animations ship with English and Turkish
/// phrase tables; everything else about a run is language-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Tr,
}

impl Language {
    /// Corner badge text, e.g. "EN | English".
    pub fn badge(&self) -> &'static str {
        match self {
            Language::En => "EN | English",
            Language::Tr => "TR | Türkçe",
        }
    }
}

/// Phrases for the CPU clock animation.
pub struct ClockStrings {
    pub title: &'static str,
    pub intro_title: &'static str,
    pub intro_text: &'static str,
    pub time_axis: &'static str,
    pub voltage_axis: &'static str,
    pub high: &'static str,
    pub low: &'static str,
    pub period: &'static str,
    pub rising_edge: &'static str,
    pub falling_edge: &'static str,
    pub time_unit: &'static str,
    pub freq_unit: &'static str,
    pub current_time: &'static str,
    pub current_voltage: &'static str,
    pub modern_cpu: &'static str,
    pub cycles_per_second: &'static str,
    pub edge_trigger: &'static str,
}

const CLOCK_EN: ClockStrings = ClockStrings {
    title: "CPU Clock Signal",
    intro_title: "How Does a CPU Clock Work?",
    intro_text: "The heartbeat of every computer",
    time_axis: "Time",
    voltage_axis: "Voltage",
    high: "HIGH (1)",
    low: "LOW (0)",
    period: "Clock Period",
    rising_edge: "Rising Edge",
    falling_edge: "Falling Edge",
    time_unit: "ns",
    freq_unit: "GHz",
    current_time: "Time",
    current_voltage: "Voltage",
    modern_cpu: "Modern CPU",
    cycles_per_second: "billion cycles/second",
    edge_trigger: "Operations triggered on edges",
};

const CLOCK_TR: ClockStrings = ClockStrings {
    title: "CPU Saat Sinyali",
    intro_title: "CPU Saati Nasıl Çalışır?",
    intro_text: "Her bilgisayarın kalp atışı",
    time_axis: "Zaman",
    voltage_axis: "Voltaj",
    high: "YÜKSEK (1)",
    low: "DÜŞÜK (0)",
    period: "Saat Periyodu",
    rising_edge: "Yükselen Kenar",
    falling_edge: "Düşen Kenar",
    time_unit: "ns",
    freq_unit: "GHz",
    current_time: "Zaman",
    current_voltage: "Voltaj",
    modern_cpu: "Modern İşlemci",
    cycles_per_second: "milyar döngü/saniye",
    edge_trigger: "İşlemler kenarlarda tetiklenir",
};

impl ClockStrings {
    pub fn get(language: Language) -> &'static Self {
        match language {
            Language::En => &CLOCK_EN,
            Language::Tr => &CLOCK_TR,
        }
    }
}

/// Phrases for the producer-consumer animation. Counter-style entries carry a
/// `{}` placeholder the builder fills in.
pub struct PipelineStrings {
    pub title: &'static str,
    pub producer: &'static str,
    pub consumer: &'static str,
    pub buffer: &'static str,
    pub buffer_size: &'static str,
    pub current_size: &'static str,
    pub producing: &'static str,
    pub consuming: &'static str,
    pub waiting: &'static str,
    pub cycle: &'static str,
    pub end_text: &'static str,
}

const PIPELINE_EN: PipelineStrings = PipelineStrings {
    title: "Producer-Consumer Mechanism",
    producer: "Producer",
    consumer: "Consumer",
    buffer: "Buffer",
    buffer_size: "Buffer Size: {}",
    current_size: "Current: {}",
    producing: "Producing...",
    consuming: "Consuming...",
    waiting: "Waiting...",
    cycle: "Cycle {}/8",
    end_text: "Cycle Complete!",
};

const PIPELINE_TR: PipelineStrings = PipelineStrings {
    title: "Üretici-Tüketici Mekanizması",
    producer: "Üretici",
    consumer: "Tüketici",
    buffer: "Tampon",
    buffer_size: "Tampon Boyutu: {}",
    current_size: "Mevcut: {}",
    producing: "Üretiliyor...",
    consuming: "Tüketiliyor...",
    waiting: "Bekliyor...",
    cycle: "Döngü {}/8",
    end_text: "Döngü Tamamlandı!",
};

impl PipelineStrings {
    pub fn get(language: Language) -> &'static Self {
        match language {
            Language::En => &PIPELINE_EN,
            Language::Tr => &PIPELINE_TR,
        }
    }
}

/// Phrases for the multi-producer network animation.
pub struct NetworkStrings {
    pub neural_title: &'static str,
    pub producers: &'static str,
    pub consumers: &'static str,
    pub buffer_layer: &'static str,
    pub garbage_collector: &'static str,
    pub dropped: &'static str,
    pub cycle: &'static str,
    pub buffer_added: &'static str,
    pub system_upgraded: &'static str,
    pub stats_before: &'static str,
    pub stats_after: &'static str,
    pub improvement: &'static str,
    pub end_text: &'static str,
}

const NETWORK_EN: NetworkStrings = NetworkStrings {
    neural_title: "Neural Network Style Producer-Consumer Model",
    producers: "Producers",
    consumers: "Consumers",
    buffer_layer: "Buffer Layer",
    garbage_collector: "Garbage Collector",
    dropped: "Dropped: {}",
    cycle: "Cycle {}/10",
    buffer_added: "New Buffer Added!",
    system_upgraded: "System Upgraded",
    stats_before: "First 5 cycles: {} packets dropped",
    stats_after: "Last 5 cycles: {} packets dropped",
    improvement: "Buffer addition reduced data loss!",
    end_text: "Network Simulation Complete!",
};

const NETWORK_TR: NetworkStrings = NetworkStrings {
    neural_title: "Sinir Ağı Tarzında Üretici-Tüketici Modeli",
    producers: "Üreticiler",
    consumers: "Tüketiciler",
    buffer_layer: "Tampon Katmanı",
    garbage_collector: "Çöp Toplayıcı",
    dropped: "Düşürüldü: {}",
    cycle: "Döngü {}/10",
    buffer_added: "Yeni Buffer Eklendi!",
    system_upgraded: "Sistem Güncellendi",
    stats_before: "İlk 5 döngü: {} paket düşürüldü",
    stats_after: "Son 5 döngü: {} paket düşürüldü",
    improvement: "Buffer eklenerek veri kaybı azaltıldı!",
    end_text: "Ağ Simülasyonu Tamamlandı!",
};

impl NetworkStrings {
    pub fn get(language: Language) -> &'static Self {
        match language {
            Language::En => &NETWORK_EN,
            Language::Tr => &NETWORK_TR,
        }
    }
}

/// Fill the single `{}` placeholder used by counter-style phrases.
pub fn fill(template: &str, value: impl ToString) -> String {
    template.replacen("{}", &value.to_string(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge() {
        assert_eq!(Language::En.badge(), "EN | English");
        assert_eq!(Language::Tr.badge(), "TR | Türkçe");
    }

    #[test]
    fn test_fill_placeholder() {
        let s = PipelineStrings::get(Language::En);
        assert_eq!(fill(s.cycle, 3), "Cycle 3/8");
        assert_eq!(fill(s.current_size, 5), "Current: 5");
    }

    #[test]
    fn test_tables_differ_by_language() {
        assert_ne!(
            ClockStrings::get(Language::En).intro_title,
            ClockStrings::get(Language::Tr).intro_title
        );
        assert_ne!(
            NetworkStrings::get(Language::En).end_text,
            NetworkStrings::get(Language::Tr).end_text
        );
    }
}
