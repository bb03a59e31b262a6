//! Wave buffer walker tests

use super::*;
use crate::memory::{GuestMemory, GuestRam};

const TARGET_RATE: u32 = 48000;
const BUFFER_A: u64 = 0x1000;
const BUFFER_B: u64 = 0x2000;
const BUFFER_C: u64 = 0x3000;
const BUFFER_D: u64 = 0x4000;
const COEFFICIENTS: u64 = 0x8000;
const CONTEXT: u64 = 0x8100;

fn ram() -> GuestRam {
    GuestRam::new(0, 0x10000)
}

fn write_pcm16(ram: &mut GuestRam, address: u64, samples: &[i16]) {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    ram.write_bytes(address, &bytes);
}

fn pcm16_buffer(address: u64, sample_count: u32) -> WaveBuffer {
    WaveBuffer {
        buffer: address,
        buffer_size: sample_count as u64 * 2,
        end_sample_offset: sample_count,
        ..Default::default()
    }
}

fn info(format: SampleFormat, behaviour: u16) -> WaveBufferInformation {
    WaveBufferInformation {
        source_sample_rate: TARGET_RATE,
        pitch: 1.0,
        sample_format: format,
        decoding_behaviour: behaviour,
        src_quality: SrcQuality::Default,
        channel_index: 0,
        channel_count: 1,
        extra_parameter: 0,
        extra_parameter_size: 0,
    }
}

fn skip_src() -> WaveBufferInformation {
    info(
        SampleFormat::PcmInt16,
        decoding_behaviour::SKIP_PITCH_AND_SAMPLE_RATE_CONVERSION,
    )
}

fn state_with_valid(valid: [bool; VOICE_WAVE_BUFFER_COUNT]) -> VoiceUpdateState {
    VoiceUpdateState {
        is_wave_buffer_valid: valid,
        ..VoiceUpdateState::new()
    }
}

fn run(
    ram: &GuestRam,
    output: &mut [f32],
    info: &WaveBufferInformation,
    wave_buffers: &[WaveBuffer; VOICE_WAVE_BUFFER_COUNT],
    state: &mut VoiceUpdateState,
) -> SourceReport {
    let memory: &dyn GuestMemory = ram;
    let sample_count = output.len();
    process_wave_buffers(
        memory,
        output,
        info,
        wave_buffers,
        state,
        TARGET_RATE,
        sample_count,
    )
}

fn as_floats(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32).collect()
}

#[test]
fn test_single_buffer_starves_and_leaves_tail() {
    let samples: Vec<i16> = (1..=10).map(|i| i * 100).collect();
    let mut ram = ram();
    write_pcm16(&mut ram, BUFFER_A, &samples);

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = pcm16_buffer(BUFFER_A, 10);
    let mut state = state_with_valid([true, false, false, false]);
    let mut output = vec![7.0f32; 240];

    let report = run(&ram, &mut output, &skip_src(), &wave_buffers, &mut state);

    assert_eq!(report.samples_written, 10);
    assert!(report.starved);
    assert_eq!(&output[..10], as_floats(&samples).as_slice());
    assert!(output[10..].iter().all(|&s| s == 7.0));

    assert_eq!(state.wave_buffer_index, 1);
    assert_eq!(state.wave_buffer_consumed, 1);
    assert_eq!(state.played_sample_count, 10);
    assert_eq!(state.offset, 0);
    assert!(!state.is_wave_buffer_valid[0]);
}

#[test]
fn test_fourth_consumption_wraps_and_resets_played_count() {
    let mut ram = ram();
    let addresses = [BUFFER_A, BUFFER_B, BUFFER_C, BUFFER_D];
    let mut expected = Vec::new();
    for (slot, &address) in addresses.iter().enumerate() {
        let samples: Vec<i16> = (0..10).map(|i| (slot as i16 + 1) * 1000 + i).collect();
        write_pcm16(&mut ram, address, &samples);
        expected.extend(as_floats(&samples));
    }

    let wave_buffers = addresses.map(|address| pcm16_buffer(address, 10));
    let mut state = state_with_valid([true; 4]);
    let mut output = vec![0.0f32; 40];

    let report = run(&ram, &mut output, &skip_src(), &wave_buffers, &mut state);

    assert_eq!(report.samples_written, 40);
    assert!(!report.starved);
    assert_eq!(output, expected);
    assert_eq!(state.wave_buffer_index, 0);
    assert_eq!(state.played_sample_count, 0);
    assert_eq!(state.wave_buffer_consumed, 4);
    assert_eq!(state.is_wave_buffer_valid, [false; 4]);
}

#[test]
fn test_end_of_stream_resets_played_count() {
    let mut ram = ram();
    write_pcm16(&mut ram, BUFFER_A, &[1; 8]);

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = WaveBuffer {
        is_end_of_stream: true,
        ..pcm16_buffer(BUFFER_A, 8)
    };
    let mut state = state_with_valid([true, false, false, false]);
    let mut output = vec![0.0f32; 8];

    run(&ram, &mut output, &skip_src(), &wave_buffers, &mut state);

    assert_eq!(state.wave_buffer_index, 1);
    assert_eq!(state.played_sample_count, 0);
}

#[test]
fn test_finite_loop_plays_count_plus_one_passes() {
    let samples: Vec<i16> = (0..8).map(|i| i * 10).collect();
    let mut ram = ram();
    write_pcm16(&mut ram, BUFFER_A, &samples);

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = WaveBuffer {
        looping: true,
        loop_count: 1,
        ..pcm16_buffer(BUFFER_A, 8)
    };
    let mut state = state_with_valid([true, false, false, false]);
    let mut output = vec![0.0f32; 20];

    let report = run(&ram, &mut output, &skip_src(), &wave_buffers, &mut state);

    assert_eq!(report.samples_written, 16);
    assert!(report.starved);
    assert_eq!(&output[..8], as_floats(&samples).as_slice());
    assert_eq!(&output[8..16], as_floats(&samples).as_slice());
    assert_eq!(state.wave_buffer_index, 1);
    assert_eq!(state.loop_count, 0);
}

#[test]
fn test_infinite_loop_keeps_buffer_and_resets_played_count() {
    let mut ram = ram();
    write_pcm16(&mut ram, BUFFER_A, &[1, 2, 3, 4, 5]);

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = WaveBuffer {
        looping: true,
        loop_count: -1,
        ..pcm16_buffer(BUFFER_A, 5)
    };
    let mut state = state_with_valid([true, false, false, false]);
    let mut output = vec![0.0f32; 23];
    let info = info(
        SampleFormat::PcmInt16,
        decoding_behaviour::SKIP_PITCH_AND_SAMPLE_RATE_CONVERSION
            | decoding_behaviour::PLAYED_SAMPLE_COUNT_RESET_WHEN_LOOPING,
    );

    let report = run(&ram, &mut output, &info, &wave_buffers, &mut state);

    assert_eq!(report.samples_written, 23);
    assert!(!report.starved);
    assert_eq!(output[20..], [1.0, 2.0, 3.0]);
    assert_eq!(state.wave_buffer_index, 0);
    assert_eq!(state.offset, 3);
    assert_eq!(state.loop_count, 4);
    assert_eq!(state.played_sample_count, 3);
    assert!(state.is_wave_buffer_valid[0]);
}

#[test]
fn test_loop_region_replaces_range_after_first_pass() {
    let samples: Vec<i16> = (0..10).collect();
    let mut ram = ram();
    write_pcm16(&mut ram, BUFFER_A, &samples);

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = WaveBuffer {
        looping: true,
        loop_count: -1,
        loop_start_sample_offset: 4,
        loop_end_sample_offset: 8,
        ..pcm16_buffer(BUFFER_A, 10)
    };
    let mut state = state_with_valid([true, false, false, false]);
    let mut output = vec![0.0f32; 18];

    run(&ram, &mut output, &skip_src(), &wave_buffers, &mut state);

    let expected: Vec<f32> = (0..10).chain(4..8).chain(4..8).map(|s| s as f32).collect();
    assert_eq!(output, expected);
}

#[test]
fn test_stereo_source_extracts_one_channel() {
    // Interleaved L/R frames
    let frames: Vec<i16> = (0..6).flat_map(|i| [i, -i - 100]).collect();
    let mut ram = ram();
    write_pcm16(&mut ram, BUFFER_A, &frames);

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = WaveBuffer {
        buffer_size: frames.len() as u64 * 2,
        ..pcm16_buffer(BUFFER_A, 6)
    };
    let mut state = state_with_valid([true, false, false, false]);
    let mut output = vec![0.0f32; 6];
    let info = WaveBufferInformation {
        channel_index: 1,
        channel_count: 2,
        ..skip_src()
    };

    run(&ram, &mut output, &info, &wave_buffers, &mut state);

    assert_eq!(output, [-100.0, -101.0, -102.0, -103.0, -104.0, -105.0]);
}

#[test]
fn test_unity_ratio_is_continuous_across_frames() {
    let samples: Vec<i16> = (0..600).map(|i| (i * 37 % 2000) as i16 - 1000).collect();
    let mut ram = ram();
    write_pcm16(&mut ram, BUFFER_A, &samples);

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = pcm16_buffer(BUFFER_A, 600);
    let mut state = state_with_valid([true, false, false, false]);
    let info = info(SampleFormat::PcmInt16, 0);

    let mut rendered = Vec::new();
    for _ in 0..2 {
        let mut output = vec![0.0f32; 240];
        let report = run(&ram, &mut output, &info, &wave_buffers, &mut state);
        assert_eq!(report.samples_written, 240);
        rendered.extend(output);
    }

    // The cubic filter reads one tap behind its history window
    let delay = SrcQuality::Default.pitch_lookahead_length() - 1;
    assert!(rendered[..delay].iter().all(|&s| s == 0.0));
    assert_eq!(&rendered[delay..], as_floats(&samples[..480 - delay]).as_slice());
    assert_eq!(state.fraction, 0);
    assert_eq!(state.offset, 480);
}

#[test]
fn test_fraction_stays_below_one_when_downsampling() {
    let mut ram = ram();
    write_pcm16(&mut ram, BUFFER_A, &[500; 1000]);

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = pcm16_buffer(BUFFER_A, 1000);
    let mut state = state_with_valid([true, false, false, false]);
    let info = WaveBufferInformation {
        source_sample_rate: 32000,
        src_quality: SrcQuality::High,
        ..info(SampleFormat::PcmInt16, 0)
    };

    for _ in 0..3 {
        let mut output = vec![0.0f32; 240];
        let report = run(&ram, &mut output, &info, &wave_buffers, &mut state);
        assert_eq!(report.samples_written, 240);
        assert!(state.fraction < FRACTION_ONE);
    }
    // 2/3 truncated to Q15 consumes slightly under 160 samples per frame
    assert_eq!(state.offset, 479);
}

#[test]
fn test_starvation_while_resampling_keeps_partial_output() {
    let samples: Vec<i16> = (0..10).map(|i| i * 100).collect();
    let mut ram = ram();
    write_pcm16(&mut ram, BUFFER_A, &samples);

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = pcm16_buffer(BUFFER_A, 10);
    let mut state = state_with_valid([true, false, false, false]);
    let info = WaveBufferInformation {
        source_sample_rate: 96000,
        src_quality: SrcQuality::Low,
        ..info(SampleFormat::PcmInt16, 0)
    };
    let mut output = vec![-1.0f32; 240];

    let report = run(&ram, &mut output, &info, &wave_buffers, &mut state);

    // Ratio 2: positions 0, 2, 4, 6, 8 fall inside the 10 decoded samples
    assert!(report.starved);
    assert_eq!(report.samples_written, 5);
    assert!(output[5..].iter().all(|&s| s == -1.0));
    assert_eq!(state.fraction, 0);
    assert_eq!(state.pitch_history[..4], samples[6..10]);
}

#[test]
fn test_unrepresentable_ratio_is_a_no_op() {
    let mut ram = ram();
    write_pcm16(&mut ram, BUFFER_A, &[1; 16]);

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = pcm16_buffer(BUFFER_A, 16);

    for pitch in [f32::NAN, -1.0, 100.0] {
        let mut state = state_with_valid([true, false, false, false]);
        state.fraction = 123;
        let before = state.clone();
        let info = WaveBufferInformation {
            pitch,
            ..info(SampleFormat::PcmInt16, 0)
        };
        let mut output = vec![9.0f32; 240];

        let report = run(&ram, &mut output, &info, &wave_buffers, &mut state);

        assert_eq!(report, SourceReport::default());
        assert_eq!(state, before, "pitch {pitch}");
        assert!(output.iter().all(|&s| s == 9.0));
    }
}

#[test]
fn test_unsupported_format_retires_buffer() {
    let mut ram = ram();
    write_pcm16(&mut ram, BUFFER_A, &[1; 16]);

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = pcm16_buffer(BUFFER_A, 16);
    let mut state = state_with_valid([true, false, false, false]);
    let info = WaveBufferInformation {
        sample_format: SampleFormat::PcmInt8,
        ..skip_src()
    };
    let mut output = vec![0.0f32; 16];

    let report = run(&ram, &mut output, &info, &wave_buffers, &mut state);

    assert_eq!(report.samples_written, 0);
    assert!(report.starved);
    assert_eq!(state.wave_buffer_consumed, 1);
}

/// Pack one ADPCM frame (header + 14 residuals)
fn adpcm_frame(header: u8, residuals: [i8; 14]) -> [u8; 8] {
    let mut frame = [header, 0, 0, 0, 0, 0, 0, 0];
    for (i, pair) in residuals.chunks(2).enumerate() {
        frame[i + 1] = ((pair[0] as u8 & 0xF) << 4) | (pair[1] as u8 & 0xF);
    }
    frame
}

#[test]
fn test_adpcm_reads_coefficients_and_context_from_memory() {
    let residuals: [i8; 14] = [0, 1, 2, 3, 4, 5, 6, 7, -1, -2, -3, -4, -5, -8];
    let mut ram = ram();
    ram.write_bytes(BUFFER_A, &adpcm_frame(0x00, residuals));
    // Pair 0 = (0, 0): samples equal the residuals at scale 0
    ram.write_bytes(COEFFICIENTS, &[0u8; 32]);
    ram.write(
        CONTEXT,
        &AdpcmLoopContext {
            pred_scale: 0,
            history0: 0,
            history1: 0,
        },
    );

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = WaveBuffer {
        buffer: BUFFER_A,
        buffer_size: 8,
        context: CONTEXT,
        context_size: 6,
        end_sample_offset: 14,
        ..Default::default()
    };
    let mut state = state_with_valid([true, false, false, false]);
    state.loop_context.history0 = 999;
    let info = WaveBufferInformation {
        sample_format: SampleFormat::Adpcm,
        extra_parameter: COEFFICIENTS,
        extra_parameter_size: 32,
        ..skip_src()
    };
    let mut output = vec![0.0f32; 14];

    let report = run(&ram, &mut output, &info, &wave_buffers, &mut state);

    assert_eq!(report.samples_written, 14);
    let expected: Vec<f32> = residuals.iter().map(|&r| r as f32).collect();
    assert_eq!(output, expected);
    assert_eq!(state.loop_context.history0, -8);
    assert_eq!(state.loop_context.history1, -5);
}

#[test]
fn test_adpcm_context_reloaded_at_loop_restart() {
    let mut ram = ram();
    // Pair 1, scale 0: each sample is the previous one plus its residual
    ram.write_bytes(BUFFER_A, &adpcm_frame(0x10, [1; 14]));
    let coefficients: Vec<u8> = [0i16, 0, 2048, 0]
        .iter()
        .flat_map(|c| c.to_le_bytes())
        .collect();
    ram.write_bytes(COEFFICIENTS, &coefficients);
    ram.write(
        CONTEXT,
        &AdpcmLoopContext {
            pred_scale: 0x10,
            history0: 100,
            history1: 0,
        },
    );

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = WaveBuffer {
        buffer: BUFFER_A,
        buffer_size: 8,
        context: CONTEXT,
        context_size: 6,
        end_sample_offset: 14,
        looping: true,
        loop_count: 1,
        ..Default::default()
    };
    let mut state = state_with_valid([true, false, false, false]);
    let info = WaveBufferInformation {
        sample_format: SampleFormat::Adpcm,
        extra_parameter: COEFFICIENTS,
        extra_parameter_size: 8,
        ..skip_src()
    };
    let mut output = vec![0.0f32; 28];

    let report = run(&ram, &mut output, &info, &wave_buffers, &mut state);

    assert_eq!(report.samples_written, 28);
    let pass: Vec<f32> = (101..=114).map(|s| s as f32).collect();
    assert_eq!(&output[..14], pass.as_slice());
    // The second pass restarts from the stored context, not from 114
    assert_eq!(&output[14..], pass.as_slice());
    assert_eq!(state.wave_buffer_index, 1);
    assert!(!state.is_wave_buffer_valid[0]);
}

#[test]
fn test_adpcm_decode_failure_skips_buffer() {
    let mut ram = ram();
    ram.write_bytes(BUFFER_A, &adpcm_frame(0x00, [1; 14]));

    let mut wave_buffers = [WaveBuffer::default(); 4];
    wave_buffers[0] = WaveBuffer {
        buffer: BUFFER_A,
        buffer_size: 8,
        end_sample_offset: 14,
        ..Default::default()
    };
    let mut state = state_with_valid([true, false, false, false]);
    // No coefficient table: the frame header cannot be resolved
    let info = WaveBufferInformation {
        sample_format: SampleFormat::Adpcm,
        ..skip_src()
    };
    let mut output = vec![0.0f32; 14];

    let report = run(&ram, &mut output, &info, &wave_buffers, &mut state);

    assert_eq!(report.samples_written, 0);
    assert!(report.starved);
    assert_eq!(state.wave_buffer_index, 1);
    assert!(!state.is_wave_buffer_valid[0]);
}

#[test]
fn test_sample_range_uses_loop_region_only_after_looping() {
    let wave_buffer = WaveBuffer {
        start_sample_offset: 2,
        end_sample_offset: 20,
        loop_start_sample_offset: 5,
        loop_end_sample_offset: 10,
        ..Default::default()
    };
    assert_eq!(wave_buffer.sample_range(0), (2, 20));
    assert_eq!(wave_buffer.sample_range(1), (5, 10));

    let whole = WaveBuffer {
        loop_start_sample_offset: 0,
        ..wave_buffer
    };
    assert_eq!(whole.sample_range(3), (2, 20));
}
